// 🏗️ Extractor - scrapes the largest-banks table from an HTML document
// Polymorphic source system: live HTTP page or an in-memory snapshot

use crate::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;

/// Fields the extractor produces, in output column order
pub const TABLE_ATTRIBUTES: [&str; 2] = ["Name", "MC_USD_Billion"];

// ============================================================================
// CORE TYPES
// ============================================================================

/// RawBank - Output of extraction, before currency conversion
#[derive(Debug, Clone, PartialEq)]
pub struct RawBank {
    pub name: String,
    pub market_cap_usd: f64,
}

impl RawBank {
    pub fn new(name: &str, market_cap_usd: f64) -> Self {
        RawBank {
            name: name.to_string(),
            market_cap_usd,
        }
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

/// BankSource - anything that can produce the extracted record set
///
/// The pipeline only depends on this trait, so a run can be driven from a
/// saved page or a test fixture instead of the network.
pub trait BankSource {
    /// Extract records in source-table order
    fn extract(&self) -> Result<Vec<RawBank>>;

    /// Short label for progress output
    fn describe(&self) -> String;
}

/// Live source: fetch the page over HTTP, then scrape it
pub struct HttpTableSource {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpTableSource {
    /// Build a source for `url`. `attributes` must be the extractor's field
    /// list (`Name`, `MC_USD_Billion`).
    pub fn new(url: &str, attributes: &[&str]) -> Result<Self> {
        check_attributes(attributes)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("banks-etl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| EtlError::FetchError {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        Ok(HttpTableSource {
            url: url.to_string(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl BankSource for HttpTableSource {
    fn extract(&self) -> Result<Vec<RawBank>> {
        let document = fetch_document(&self.client, &self.url)?;
        parse_banks_table(&document)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Offline source: scrape a document already held in memory
pub struct HtmlSnapshotSource {
    html: String,
}

impl HtmlSnapshotSource {
    pub fn new(html: impl Into<String>) -> Self {
        HtmlSnapshotSource { html: html.into() }
    }
}

impl BankSource for HtmlSnapshotSource {
    fn extract(&self) -> Result<Vec<RawBank>> {
        parse_banks_table(&self.html)
    }

    fn describe(&self) -> String {
        format!("HTML snapshot ({} bytes)", self.html.len())
    }
}

fn check_attributes(attributes: &[&str]) -> Result<()> {
    if attributes != TABLE_ATTRIBUTES {
        return Err(EtlError::InvalidConfig(format!(
            "unsupported table attributes {:?}, expected {:?}",
            attributes, TABLE_ATTRIBUTES
        )));
    }
    Ok(())
}

// ============================================================================
// FETCH
// ============================================================================

/// Blocking GET of the document body. Non-2xx statuses are errors; no retry.
pub fn fetch_document(client: &reqwest::blocking::Client, url: &str) -> Result<String> {
    let fetch_error = |err: reqwest::Error| EtlError::FetchError {
        url: url.to_string(),
        message: err.to_string(),
    };

    log::debug!("GET {}", url);

    let response = client
        .get(url)
        .send()
        .map_err(fetch_error)?
        .error_for_status()
        .map_err(fetch_error)?;

    response.text().map_err(fetch_error)
}

// ============================================================================
// TABLE SCRAPING
// ============================================================================

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|err| EtlError::InvalidSelector {
        selector: css.to_string(),
        message: err.to_string(),
    })
}

/// Text of a cell up to the first newline, surrounding whitespace trimmed
fn first_line(cell: &ElementRef) -> String {
    let text: String = cell.text().collect();
    text.split('\n').next().unwrap_or("").trim().to_string()
}

/// For each `<table>` start tag in source order, whether a `<tbody>` tag is
/// written directly inside it (not inside a nested table).
///
/// html5ever inserts a `tbody` into every table while parsing, so only the
/// raw markup can tell an authored table body from an implied one.
fn tables_with_authored_body(html: &str) -> Vec<bool> {
    let lower = html.to_ascii_lowercase();
    let mut flags: Vec<bool> = Vec::new();
    let mut open: Vec<usize> = Vec::new();
    let mut rest = lower.as_str();

    while let Some(start) = rest.find('<') {
        rest = &rest[start + 1..];

        if let Some(comment) = rest.strip_prefix("!--") {
            rest = match comment.find("-->") {
                Some(end) => &comment[end + 3..],
                None => "",
            };
            continue;
        }

        let closing = rest.starts_with('/');
        let name: String = rest
            .trim_start_matches('/')
            .chars()
            .take_while(char::is_ascii_alphanumeric)
            .collect();

        match (closing, name.as_str()) {
            (false, "table") => {
                open.push(flags.len());
                flags.push(false);
            }
            (true, "table") => {
                open.pop();
            }
            (false, "tbody") => {
                if let Some(flag) = open.last().and_then(|&i| flags.get_mut(i)) {
                    *flag = true;
                }
            }
            (false, "script") | (false, "style") => {
                // Raw text; a "<table" in here is not markup
                let close = format!("</{}", name);
                rest = match rest.find(&close) {
                    Some(end) => &rest[end..],
                    None => "",
                };
            }
            _ => {}
        }
    }

    flags
}

/// Scrape bank rows out of the first `tbody` in the document.
///
/// Only table bodies written in the markup count; a table without one is
/// passed over even though the HTML parser gives it an implied body.
///
/// A row is kept only when it has at least two `td` cells and the second one
/// holds a link; every other row (headers, footnotes, totals) is skipped.
/// A kept row whose market cap does not parse aborts the whole extraction.
pub fn parse_banks_table(html: &str) -> Result<Vec<RawBank>> {
    let table_sel = selector("table")?;
    let tbody_sel = selector("tbody")?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;
    let a_sel = selector("a")?;

    let document = Html::parse_document(html);
    let body = document
        .select(&table_sel)
        .zip(tables_with_authored_body(html))
        .filter(|(_, authored)| *authored)
        .find_map(|(table, _)| table.select(&tbody_sel).next())
        .ok_or(EtlError::NoTableFound)?;

    let mut banks = Vec::new();

    for (row_index, row) in body.select(&tr_sel).enumerate() {
        let cells: Vec<ElementRef> = row.select(&td_sel).collect();

        let name_cell = match cells.get(1) {
            Some(cell) if cell.select(&a_sel).next().is_some() => cell,
            _ => {
                log::trace!("Skipping row {} ({} cells)", row_index, cells.len());
                continue;
            }
        };

        let name = first_line(name_cell);
        if name.is_empty() {
            return Err(EtlError::FieldParseError {
                row: row_index,
                field: "Name",
                value: name,
            });
        }

        let raw_cap = cells.get(2).map(first_line).unwrap_or_default();
        let market_cap_usd = raw_cap
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .ok_or_else(|| EtlError::FieldParseError {
                row: row_index,
                field: "MC_USD_Billion",
                value: raw_cap.clone(),
            })?;

        banks.push(RawBank::new(&name, market_cap_usd));
    }

    log::info!("Extracted {} bank rows", banks.len());
    Ok(banks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Trimmed-down copy of the archived Wikipedia markup
    const BANKS_PAGE: &str = r#"
<html><body>
<h2>By market capitalization</h2>
<table class="wikitable sortable">
<tbody>
<tr><th>Rank</th><th>Bank name</th><th>Market cap<br/>(US$ billion)</th></tr>
<tr><td>1</td><td><span class="flagicon"></span> <a href="/wiki/JPMorgan_Chase">JPMorgan Chase</a>
</td><td>432.92
</td></tr>
<tr><td>2</td><td><a href="/wiki/Bank_of_America">Bank of America</a>
</td><td>231.52
</td></tr>
<tr><td>3</td><td>Unlinked Bank</td><td>999.0</td></tr>
<tr><td>Total</td></tr>
<tr><td>4</td><td><a href="/wiki/ICBC">Industrial and Commercial Bank of China</a>
</td><td>194.56
</td></tr>
</tbody>
</table>
<table><tbody>
<tr><td>1</td><td><a href="/wiki/Other">Second table bank</a></td><td>1.0</td></tr>
</tbody></table>
</body></html>
"#;

    #[test]
    fn test_parse_qualifying_rows_in_order() {
        let banks = parse_banks_table(BANKS_PAGE).unwrap();

        assert_eq!(
            banks,
            vec![
                RawBank::new("JPMorgan Chase", 432.92),
                RawBank::new("Bank of America", 231.52),
                RawBank::new("Industrial and Commercial Bank of China", 194.56),
            ]
        );
    }

    #[test]
    fn test_row_with_single_cell_is_skipped() {
        let html = r#"<table><tbody>
            <tr><td>only one cell</td></tr>
            <tr><td>1</td><td><a href="/a">Bank A</a></td><td>10.5</td></tr>
        </tbody></table>"#;

        let banks = parse_banks_table(html).unwrap();

        assert_eq!(banks, vec![RawBank::new("Bank A", 10.5)]);
    }

    #[test]
    fn test_row_without_link_is_skipped() {
        let html = r#"<table><tbody>
            <tr><td>1</td><td>Bank A</td><td>10.5</td></tr>
        </tbody></table>"#;

        let banks = parse_banks_table(html).unwrap();

        assert!(banks.is_empty());
    }

    #[test]
    fn test_duplicate_names_pass_through() {
        let html = r#"<table><tbody>
            <tr><td>1</td><td><a href="/a">Bank A</a></td><td>10</td></tr>
            <tr><td>2</td><td><a href="/a">Bank A</a></td><td>20</td></tr>
        </tbody></table>"#;

        let banks = parse_banks_table(html).unwrap();

        assert_eq!(banks.len(), 2);
        assert_eq!(banks[0].market_cap_usd, 10.0);
        assert_eq!(banks[1].market_cap_usd, 20.0);
    }

    #[test]
    fn test_bad_market_cap_aborts_extraction() {
        let html = r#"<table><tbody>
            <tr><td>1</td><td><a href="/a">Bank A</a></td><td>10</td></tr>
            <tr><td>2</td><td><a href="/b">Bank B</a></td><td>n/a</td></tr>
        </tbody></table>"#;

        let err = parse_banks_table(html).unwrap_err();

        match err {
            EtlError::FieldParseError { row, field, value } => {
                assert_eq!(row, 1);
                assert_eq!(field, "MC_USD_Billion");
                assert_eq!(value, "n/a");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_market_cap_cell_aborts_extraction() {
        let html = r#"<table><tbody>
            <tr><td>1</td><td><a href="/a">Bank A</a></td></tr>
        </tbody></table>"#;

        let err = parse_banks_table(html).unwrap_err();

        assert!(matches!(err, EtlError::FieldParseError { .. }));
    }

    #[test]
    fn test_negative_market_cap_is_rejected() {
        let html = r#"<table><tbody>
            <tr><td>1</td><td><a href="/a">Bank A</a></td><td>-5</td></tr>
        </tbody></table>"#;

        assert!(matches!(
            parse_banks_table(html),
            Err(EtlError::FieldParseError { .. })
        ));
    }

    #[test]
    fn test_document_without_table() {
        let err = parse_banks_table("<html><body><p>nothing here</p></body></html>").unwrap_err();

        assert!(matches!(err, EtlError::NoTableFound));
    }

    #[test]
    fn test_table_without_authored_body_is_passed_over() {
        let html = r#"<html><body>
            <table class="infobox"><tr><td>1</td><td><a href="/i">Infobox</a></td><td>7</td></tr></table>
            <table><tbody>
            <tr><td>1</td><td><a href="/r">Real Bank</a></td><td>10</td></tr>
            </tbody></table>
        </body></html>"#;

        let banks = parse_banks_table(html).unwrap();

        assert_eq!(banks, vec![RawBank::new("Real Bank", 10.0)]);
    }

    #[test]
    fn test_only_implied_bodies_is_no_table() {
        let html = r#"<table><tr><td>1</td><td><a href="/a">Bank A</a></td><td>10</td></tr></table>"#;

        assert!(matches!(parse_banks_table(html), Err(EtlError::NoTableFound)));
    }

    #[test]
    fn test_authored_body_detection() {
        let html = r#"<!-- <table><tbody> -->
            <TABLE><TR><TD>x</TD></TR></TABLE>
            <table><tbody><tr><td><table><tr><td>nested</td></tr></table></td></tr></tbody></table>
            <script>var t = "<table><tbody>";</script>
            <table><thead></thead><TBODY></TBODY></table>"#;

        assert_eq!(tables_with_authored_body(html), vec![false, true, false, true]);
    }

    #[test]
    fn test_snapshot_source_uses_same_rules() {
        let source = HtmlSnapshotSource::new(BANKS_PAGE);

        let banks = source.extract().unwrap();

        assert_eq!(banks.len(), 3);
        assert!(source.describe().starts_with("HTML snapshot"));
    }

    #[test]
    fn test_http_source_rejects_unknown_attributes() {
        let err = HttpTableSource::new("http://localhost/banks", &["Name", "Rank"]).err();

        assert!(matches!(err, Some(EtlError::InvalidConfig(_))));
    }

    #[test]
    fn test_http_source_keeps_url() {
        let source = HttpTableSource::new("http://localhost/banks", &TABLE_ATTRIBUTES).unwrap();

        assert_eq!(source.url(), "http://localhost/banks");
        assert_eq!(source.describe(), "http://localhost/banks");
    }

    /// Serve one canned HTTP response on a free local port
    fn serve_once(response: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{}/banks", addr)
    }

    #[test]
    fn test_not_found_status_is_fetch_error() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string(),
        );
        let client = reqwest::blocking::Client::new();

        let err = fetch_document(&client, &url).unwrap_err();

        match err {
            EtlError::FetchError { url: failed, message } => {
                assert_eq!(failed, url);
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_http_source_scrapes_served_page() {
        let body = r#"<table><tbody><tr><td>1</td><td><a href="/a">Bank A</a></td><td>12.5</td></tr></tbody></table>"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let source = HttpTableSource::new(&serve_once(response), &TABLE_ATTRIBUTES).unwrap();

        assert_eq!(source.extract().unwrap(), vec![RawBank::new("Bank A", 12.5)]);
    }

    #[test]
    fn test_unreachable_url_is_fetch_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let source = HttpTableSource::new("http://127.0.0.1:9/banks", &TABLE_ATTRIBUTES).unwrap();

        assert!(matches!(
            source.extract(),
            Err(EtlError::FetchError { .. })
        ));
    }
}
