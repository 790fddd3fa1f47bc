use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::configuration::SheetsSettings;
use crate::domain::ListingRecord;

const RESULT_COLUMNS: [&str; 5] = [
    "Keyword",
    "Item Description",
    "Auction end date",
    "Current price",
    "Auction image / thumbnail URL (extra credit)",
];

// Ranges are path segments; brackets and spaces must be pre-encoded.
const KEYWORDS_RANGE: &str = "%5BKEYWORDS%5D!A:A";
const RESULTS_RANGE: &str = "RESULTS%20TEMPLATE!A1:E1000";
const RESULTS_ANCHOR: &str = "RESULTS%20TEMPLATE!A1";

/// Thin client over the Google Sheets values API. Reads the keyword column
/// and overwrites the results area; nothing here is fatal to a scrape.
pub struct SheetsClient {
    client: Client,
    settings: SheetsSettings,
}

#[derive(Deserialize)]
struct ValueRangeResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Serialize)]
struct ValueRangeBody {
    range: String,
    #[serde(rename = "majorDimension")]
    major_dimension: String,
    values: Vec<Vec<String>>,
}

impl SheetsClient {
    pub fn new(settings: SheetsSettings) -> Self {
        SheetsClient {
            client: Client::new(),
            settings,
        }
    }

    fn values_url(&self, range: &str) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.settings.api_base_url.trim_end_matches('/'),
            self.settings.spreadsheet_id,
            range
        )
    }

    /// Read keywords from the first column of the `[KEYWORDS]` tab, dropping
    /// a header row and blank cells.
    pub async fn read_keywords(&self) -> anyhow::Result<Vec<String>> {
        let response = self
            .client
            .get(self.values_url(KEYWORDS_RANGE))
            .bearer_auth(&self.settings.access_token)
            .send()
            .await?
            .error_for_status()?;

        let body: ValueRangeResponse = response.json().await?;

        let mut keywords: Vec<String> = body
            .values
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .map(|kw| kw.trim().to_string())
            .filter(|kw| !kw.is_empty())
            .collect();

        if keywords
            .first()
            .map(|kw| kw.eq_ignore_ascii_case("keyword"))
            .unwrap_or(false)
        {
            keywords.remove(0);
        }

        Ok(keywords)
    }

    /// Idempotent overwrite of the `RESULTS TEMPLATE` area: clear, then
    /// write a header row plus one row per record.
    pub async fn write_results(
        &self,
        keyword: &str,
        records: &[ListingRecord],
    ) -> anyhow::Result<()> {
        self.client
            .post(format!("{}:clear", self.values_url(RESULTS_RANGE)))
            .bearer_auth(&self.settings.access_token)
            .json(&serde_json::json!({}))
            .send()
            .await?
            .error_for_status()?;

        let body = ValueRangeBody {
            range: "RESULTS TEMPLATE!A1".to_string(),
            major_dimension: "ROWS".to_string(),
            values: result_rows(keyword, records),
        };

        self.client
            .put(format!(
                "{}?valueInputOption=USER_ENTERED",
                self.values_url(RESULTS_ANCHOR)
            ))
            .bearer_auth(&self.settings.access_token)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        log::info!("Wrote {} result rows for '{}'", records.len(), keyword);
        Ok(())
    }
}

/// Header row plus one row per record. Image cells become =IMAGE formulas so
/// the spreadsheet renders thumbnails; empty image URLs stay empty cells.
fn result_rows(keyword: &str, records: &[ListingRecord]) -> Vec<Vec<String>> {
    let mut rows = vec![RESULT_COLUMNS.iter().map(|c| c.to_string()).collect()];

    for record in records {
        let image_cell = if record.image_url.trim().is_empty() {
            String::new()
        } else {
            format!("=IMAGE(\"{}\", 3, 100, 100)", record.image_url)
        };

        rows.push(vec![
            keyword.to_string(),
            record.description.clone(),
            record.end_date_text.clone(),
            record.price_text.clone(),
            image_cell,
        ]);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::result_rows;
    use crate::domain::ListingRecord;

    #[test]
    fn rows_start_with_header_and_fill_keyword_column() {
        let records = vec![ListingRecord {
            description: "Vintage Lamp".to_string(),
            price_text: "$45.00".to_string(),
            end_date_text: "Ends Dec 1".to_string(),
            image_url: "https://shopgoodwill.com/img/lamp.jpg".to_string(),
        }];

        let rows = result_rows("vintage lamp", &records);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "Keyword");
        assert_eq!(rows[1][0], "vintage lamp");
        assert_eq!(rows[1][1], "Vintage Lamp");
        assert_eq!(
            rows[1][4],
            "=IMAGE(\"https://shopgoodwill.com/img/lamp.jpg\", 3, 100, 100)"
        );
    }

    #[test]
    fn missing_image_stays_an_empty_cell() {
        let rows = result_rows("x", &[ListingRecord::no_results("x")]);
        assert_eq!(rows[1][4], "");
    }
}
