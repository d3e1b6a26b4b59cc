use crate::model::ProductRecord;

pub fn normalize_all(records: &mut [ProductRecord]) {
    for record in records.iter_mut() {
        normalize_record(record);
    }
}

fn normalize_record(record: &mut ProductRecord) {
    record.product_name = record.product_name.as_deref().map(collapse_whitespace);
    record.product_price = record.product_price.as_deref().map(normalize_price);
    record.product_link = record.product_link.as_deref().map(|s| s.trim().to_string());
    record.product_image = record.product_image.as_deref().map(|s| s.trim().to_string());
}

/// Collapses runs of whitespace (aria labels often carry line breaks).
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prefixes a bare numeral with `$`; anything already carrying a symbol is
/// left as-is.
pub fn normalize_price(raw: &str) -> String {
    let trimmed = raw.trim();
    let bare = !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',');
    if bare {
        format!("${}", trimmed)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_value_gets_currency_prefix() {
        assert_eq!(normalize_price("2.99"), "$2.99");
        assert_eq!(normalize_price(" 12 "), "$12");
    }

    #[test]
    fn per_unit_text_is_kept() {
        assert_eq!(normalize_price("$2.99/lb"), "$2.99/lb");
        assert_eq!(normalize_price(""), "");
    }

    #[test]
    fn normalizes_record_fields_in_place() {
        let mut records = vec![ProductRecord {
            product_name: Some("  Organic\n   Kale ".into()),
            store_name: "Safeway".into(),
            product_price: Some("1.49".into()),
            product_link: Some(" https://www.safeway.com/p/1 ".into()),
            product_image: None,
        }];
        normalize_all(&mut records);
        assert_eq!(records[0].product_name.as_deref(), Some("Organic Kale"));
        assert_eq!(records[0].product_price.as_deref(), Some("$1.49"));
        assert_eq!(records[0].product_link.as_deref(), Some("https://www.safeway.com/p/1"));
        assert_eq!(records[0].product_image, None);
    }
}
