use serde::{Deserialize, Serialize};

/// One auction listing row handed to the spreadsheet and database sinks.
///
/// All four fields are always populated. Extraction failures are encoded as
/// sentinel strings ("N/A", "Price not available") so downstream writers
/// never have to deal with missing keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub description: String,
    pub price_text: String,
    pub end_date_text: String,
    pub image_url: String,
}

impl ListingRecord {
    /// Single synthetic record emitted when extraction finds nothing, so the
    /// scraper never returns an empty list.
    pub fn no_results(keyword: &str) -> Self {
        ListingRecord {
            description: format!(
                "No results found for '{}' - website may be blocking automated access",
                keyword
            ),
            price_text: "N/A".to_string(),
            end_date_text: "N/A".to_string(),
            image_url: "".to_string(),
        }
    }

    /// Terminal record after every backend and retry round is exhausted.
    pub fn all_methods_failed(keyword: &str) -> Self {
        ListingRecord {
            description: format!(
                "All scraping methods failed for '{}' - website may be blocking automated access",
                keyword
            ),
            price_text: "N/A".to_string(),
            end_date_text: "N/A".to_string(),
            image_url: "".to_string(),
        }
    }

    pub fn scrape_error(keyword: &str, reason: &str) -> Self {
        ListingRecord {
            description: format!("Error scraping results for '{}': {}", keyword, reason),
            price_text: "N/A".to_string(),
            end_date_text: "N/A".to_string(),
            image_url: "".to_string(),
        }
    }

    /// True for the synthetic record emitted when extraction found nothing.
    pub fn is_no_results(&self) -> bool {
        self.description.starts_with("No results found for")
    }

    /// Placeholder description assigned when no real description element is
    /// found. Candidates that still carry it get dropped by the extractor.
    pub fn placeholder_description(index: usize) -> String {
        format!("Item {}", index + 1)
    }
}

/// Per-invocation scrape parameters. Built by the caller, never persisted.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub keyword: String,
    pub max_results: usize,
    pub max_retries: u32,
}

#[cfg(test)]
mod tests {
    use super::ListingRecord;

    #[test]
    fn record_serializes_exactly_four_keys() {
        let record = ListingRecord::no_results("vintage watch");
        let value = serde_json::to_value(&record).unwrap();
        let object = value.as_object().unwrap();

        let mut keys: Vec<&str> = object.keys().map(|k| k.as_str()).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["description", "end_date_text", "image_url", "price_text"]
        );
    }

    #[test]
    fn synthetic_records_carry_sentinels() {
        let record = ListingRecord::all_methods_failed("x");
        assert!(record.description.contains("All scraping methods failed for 'x'"));
        assert_eq!(record.price_text, "N/A");
        assert_eq!(record.end_date_text, "N/A");
        assert_eq!(record.image_url, "");

        let error = ListingRecord::scrape_error("x", "connection reset");
        assert_eq!(
            error.description,
            "Error scraping results for 'x': connection reset"
        );
        assert_eq!(error.price_text, "N/A");
    }

    #[test]
    fn only_the_no_results_record_is_flagged_as_such() {
        assert!(ListingRecord::no_results("x").is_no_results());
        assert!(!ListingRecord::all_methods_failed("x").is_no_results());
        assert!(!ListingRecord::scrape_error("x", "boom").is_no_results());

        let genuine = ListingRecord {
            description: "Vintage Lamp".to_string(),
            price_text: "$45.00".to_string(),
            end_date_text: "Ends Dec 1".to_string(),
            image_url: "".to_string(),
        };
        assert!(!genuine.is_no_results());
    }
}
