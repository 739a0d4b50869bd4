//! Property-based tests for pagekit.
//!
//! Uses proptest to check resolution invariants over arbitrary inputs.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use pagekit::mock::{MockDriver, MockElement};
use pagekit::{
    select_variant, DeviceDescriptor, DeviceType, Element, ElementList, ListBinding, Locator,
    LocatorConverter, LocatorPipeline, MatchTier, SearchScope, VariantDescriptor, PLACEHOLDER,
};
use proptest::prelude::*;

// === Converter Pipeline ===

proptest! {
    /// N placeholders and N arguments leave no placeholder, arguments used in order.
    #[test]
    fn prop_format_consumes_all_placeholders(
        args in prop::collection::vec("[a-z0-9]{1,8}", 0..6)
    ) {
        let template = args
            .iter()
            .map(|_| format!("//div[@data-key='{PLACEHOLDER}']"))
            .collect::<Vec<_>>()
            .join("|");
        let locator = Locator::xpath(template);
        let pipeline = LocatorPipeline::new().with(LocatorConverter::Format(args.clone()));
        let converted = pipeline.convert(&locator).unwrap();
        prop_assert!(!converted.selector().contains(PLACEHOLDER));
        let mut rest = converted.selector();
        for arg in &args {
            let needle = format!("'{arg}'");
            let at = rest.find(&needle);
            prop_assert!(at.is_some(), "argument {} missing or out of order", arg);
            rest = &rest[at.unwrap_or(0) + needle.len()..];
        }
    }

    /// Running the pending pipeline over converted output changes nothing.
    #[test]
    fn prop_pipeline_reaches_fixpoint(
        value in "[A-Za-z ]{0,12}",
        index in 0usize..20
    ) {
        let locator = Locator::xpath(format!("//li[text()='{value}']"));
        let pipeline = LocatorPipeline::new()
            .with(LocatorConverter::CaseInsensitive)
            .with(LocatorConverter::Index(index));
        let converted = pipeline.apply(&locator).unwrap();
        let again = converted.pending.apply(&converted.locator).unwrap();
        prop_assert_eq!(again.locator, converted.locator);
    }
}

// === Lists ===

fn rows(driver: &MockDriver, ids: std::ops::Range<usize>) {
    for i in ids {
        driver.add(
            MockElement::new(format!("row-{i}"), "tr")
                .matching(&Locator::xpath("//tr"))
                .with_text(format!("row {i}")),
        );
    }
}

proptest! {
    /// Indexed lists rebuild every position after the element count changes.
    #[test]
    fn prop_indexed_list_rebuilds_positions(before in 0usize..6, after in 0usize..6) {
        let driver = Arc::new(MockDriver::new());
        rows(&driver, 0..before);
        let list: ElementList = ElementList::new(
            driver.clone(),
            "rows",
            Locator::xpath("//tr"),
            SearchScope::Root,
            ListBinding::Indexed,
        )
        .unwrap();
        prop_assert_eq!(list.len().unwrap(), before);
        for i in 0..before {
            driver.remove(&format!("row-{i}"));
        }
        rows(&driver, 10..10 + after);
        let items = list.items().unwrap();
        prop_assert_eq!(items.len(), after);
        for (i, item) in items.iter().enumerate() {
            prop_assert_eq!(item.name(), format!("rows[{i}]"));
            prop_assert_eq!(item.text().unwrap(), format!("row {}", 10 + i));
        }
    }

    /// Snapshot items keep operating on their elements without new lookups.
    #[test]
    fn prop_snapshot_items_never_refind(count in 1usize..6) {
        let driver = Arc::new(MockDriver::new());
        rows(&driver, 0..count);
        let list: ElementList = ElementList::new(
            driver.clone(),
            "rows",
            Locator::xpath("//tr"),
            SearchScope::Root,
            ListBinding::Snapshot,
        )
        .unwrap();
        let items = list.items().unwrap();
        let finds = driver.find_count();
        for item in &items {
            item.click().unwrap();
        }
        prop_assert_eq!(driver.find_count(), finds);
    }
}

// === Variants ===

proptest! {
    /// A candidate listing the device's major version wins over an unrelated default.
    #[test]
    fn prop_major_version_selected(major in 2u32..40, minor in 0u32..10) {
        let matching = VariantDescriptor::new("Matching", "Base", DeviceType::AndroidPhone)
            .versions([major.to_string()]);
        let default = VariantDescriptor::new("Default", "Base", DeviceType::AndroidPhone)
            .versions(["1.0"]);
        let device = DeviceDescriptor::new(DeviceType::AndroidPhone, format!("{major}.{minor}"));
        let (index, tier) = select_variant("Base", &[&default, &matching], &device).unwrap();
        prop_assert_eq!(index, 1);
        prop_assert_eq!(tier, MatchTier::MajorVersion);
    }
}
