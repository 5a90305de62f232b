// 🔁 Transformer - derives GBP/EUR/INR market caps from the USD figure

use crate::db::BankRecord;
use crate::error::Result;
use crate::parser::RawBank;
use crate::rates::{Currency, ExchangeRateTable};

/// Round to 2 decimal places, halves away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Convert a USD amount with the given rate, rounded to cents
pub fn convert(market_cap_usd: f64, rate: f64) -> f64 {
    round2(market_cap_usd * rate)
}

/// Add the three converted columns to every extracted record.
///
/// All required rates are resolved up front, so a missing rate fails the
/// step even when there are no records. Inputs are left untouched.
pub fn transform(banks: &[RawBank], rates: &ExchangeRateTable) -> Result<Vec<BankRecord>> {
    let gbp = rates.require(Currency::Gbp)?;
    let eur = rates.require(Currency::Eur)?;
    let inr = rates.require(Currency::Inr)?;

    let records: Vec<BankRecord> = banks
        .iter()
        .map(|bank| BankRecord {
            name: bank.name.clone(),
            market_cap_usd: bank.market_cap_usd,
            market_cap_gbp: convert(bank.market_cap_usd, gbp),
            market_cap_eur: convert(bank.market_cap_usd, eur),
            market_cap_inr: convert(bank.market_cap_usd, inr),
        })
        .collect();

    log::info!(
        "Transformed {} records (GBP {}, EUR {}, INR {})",
        records.len(),
        gbp,
        eur,
        inr
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;

    fn sample_rates() -> ExchangeRateTable {
        ExchangeRateTable::new()
            .with_rate("GBP", 0.8)
            .with_rate("EUR", 0.93)
            .with_rate("INR", 82.1)
    }

    #[test]
    fn test_bank_a_scenario() {
        let banks = vec![RawBank::new("Bank A", 100.0)];

        let records = transform(&banks, &sample_rates()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Bank A");
        assert_eq!(records[0].market_cap_usd, 100.0);
        assert_eq!(records[0].market_cap_gbp, 80.0);
        assert_eq!(records[0].market_cap_eur, 93.0);
        assert_eq!(records[0].market_cap_inr, 8210.0);
    }

    #[test]
    fn test_values_are_rounded_to_two_decimals() {
        let banks = vec![RawBank::new("JPMorgan Chase", 432.92)];
        let rates = ExchangeRateTable::new()
            .with_rate("GBP", 0.8)
            .with_rate("EUR", 0.93)
            .with_rate("INR", 82.95);

        let records = transform(&banks, &rates).unwrap();

        assert_eq!(records[0].market_cap_gbp, 346.34);
        assert_eq!(records[0].market_cap_eur, 402.62);
        assert_eq!(records[0].market_cap_inr, 35910.71);
    }

    #[test]
    fn test_every_record_matches_rounded_product() {
        let banks = vec![
            RawBank::new("A", 432.92),
            RawBank::new("B", 231.52),
            RawBank::new("C", 0.0),
            RawBank::new("A", 194.56),
        ];
        let rates = sample_rates();

        let records = transform(&banks, &rates).unwrap();

        assert_eq!(records.len(), banks.len());
        for (bank, record) in banks.iter().zip(&records) {
            assert_eq!(record.name, bank.name);
            assert_eq!(record.market_cap_usd, bank.market_cap_usd);
            assert_eq!(record.market_cap_gbp, round2(bank.market_cap_usd * 0.8));
            assert_eq!(record.market_cap_eur, round2(bank.market_cap_usd * 0.93));
            assert_eq!(record.market_cap_inr, round2(bank.market_cap_usd * 82.1));
        }
    }

    #[test]
    fn test_missing_rate_fails() {
        let rates = ExchangeRateTable::new()
            .with_rate("GBP", 0.8)
            .with_rate("INR", 82.1);

        let err = transform(&[RawBank::new("Bank A", 1.0)], &rates).unwrap_err();

        match err {
            EtlError::MissingRate { currency } => assert_eq!(currency, "EUR"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_rate_fails_even_without_records() {
        let err = transform(&[], &ExchangeRateTable::new()).unwrap_err();

        assert!(matches!(err, EtlError::MissingRate { .. }));
    }

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(2.5), 2.5);
        assert_eq!(round2(1.004), 1.0);
    }
}
