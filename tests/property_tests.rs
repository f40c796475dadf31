/// Property-based tests using proptest
/// Tests invariants of phone normalization and new-lead selection
use lead_dialer::models::{Lead, LeadRow};
use lead_dialer::phone::{self, PhoneRejection, MAX_DIGITS, MIN_DIGITS};
use lead_dialer::processor::select_new;
use proptest::prelude::*;
use std::collections::HashSet;

// Property: normalization should never panic
proptest! {
    #[test]
    fn phone_normalization_never_panics(raw in "\\PC*") {
        let _ = phone::normalize(&raw);
        let _ = phone::submission_form(&raw);
    }

    #[test]
    fn accepted_phones_are_plus_and_digits(raw in "\\PC*") {
        if let Ok(normalized) = phone::normalize(&raw) {
            let digits = normalized.digits();
            prop_assert!(digits.chars().all(|c| c.is_ascii_digit()));
            prop_assert!(digits.len() >= MIN_DIGITS && digits.len() <= MAX_DIGITS);
            prop_assert_eq!(normalized.submission(), format!("+{}", digits));
        }
    }
}

// Property: formatting characters do not change the number
proptest! {
    #[test]
    fn separators_are_ignored(
        digits in "[1-9][0-9]{6,14}",
        separators in prop::collection::vec(
            prop::sample::select(vec!["", " ", "-", ".", "(", ")"]),
            15
        ),
        plus in proptest::bool::ANY
    ) {
        let mut raw = String::new();
        if plus {
            raw.push('+');
        }
        for (c, sep) in digits.chars().zip(separators.iter()) {
            raw.push(c);
            raw.push_str(sep);
        }

        let normalized = phone::normalize(&raw).unwrap();
        prop_assert_eq!(normalized.digits(), digits.as_str());
        prop_assert_eq!(phone::submission_form(&raw), Some(format!("+{}", digits)));
    }

    #[test]
    fn short_numbers_are_rejected(digits in "[0-9]{1,6}") {
        let result = phone::normalize(&digits);
        prop_assert!(matches!(
            result,
            Err(PhoneRejection::TooShort(_)) | Err(PhoneRejection::Empty)
        ));
    }

    #[test]
    fn long_numbers_are_rejected(digits in "[1-9][0-9]{15,24}") {
        prop_assert_eq!(
            phone::normalize(&digits),
            Err(PhoneRejection::TooLong(digits.len()))
        );
    }

    #[test]
    fn text_without_digits_is_empty(raw in "[a-wyzA-WYZ ()+-]{0,20}") {
        prop_assert_eq!(phone::normalize(&raw), Err(PhoneRejection::Empty));
    }
}

fn lead(id: &str) -> Lead {
    let headers = vec!["lead_id".to_string(), "Phone Number".to_string()];
    let cells = vec![id.to_string(), "5551234567".to_string()];
    Lead::from_row(LeadRow::from_cells(&headers, &cells))
}

// Property: new-lead selection
proptest! {
    #[test]
    fn selection_excludes_processed_dedups_and_keeps_order(
        ids in prop::collection::vec("[a-z0-9]{0,4}", 0..30),
        processed in prop::collection::hash_set("[a-z0-9]{1,4}", 0..10)
    ) {
        let leads: Vec<Lead> = ids.iter().map(|id| lead(id)).collect();
        let processed: HashSet<String> = processed.into_iter().collect();

        let selected: Vec<&str> = select_new(&leads, &processed)
            .into_iter()
            .filter_map(|lead| lead.id())
            .collect();

        let mut seen = HashSet::new();
        let expected: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| !id.is_empty() && !processed.contains(*id))
            .filter(|id| seen.insert(*id))
            .collect();

        prop_assert_eq!(selected, expected);
    }
}
