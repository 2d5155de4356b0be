// tests/normalize.rs
use opportunity_aggregator::ingest::normalize;
use opportunity_aggregator::ingest::types::DescriptionStyle;
use opportunity_aggregator::{ListingSource, RawRecord};

fn raw(id: &str, title: &str, location: &str, link: &str) -> RawRecord {
    RawRecord {
        id: id.into(),
        title: title.into(),
        company: "Acme".into(),
        location: location.into(),
        link: link.into(),
        description: None,
    }
}

#[test]
fn incomplete_records_are_dropped_and_siblings_kept() {
    let input = vec![
        raw("li-1", "Intern", "Remote", "https://x/1"),
        raw("li-2", "", "Remote", "https://x/2"),
        raw("li-3", "Analyst", "", "https://x/3"),
        raw("li-4", "Designer", "Pune", ""),
        raw("li-5", "Engineer", "Delhi", "https://x/5"),
    ];

    let (kept, rejected) = normalize(input, ListingSource::External, DescriptionStyle::TitleAtCompany);

    assert_eq!(rejected, 3);
    let ids: Vec<_> = kept.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec!["li-1", "li-5"], "order preserved");
    assert!(kept.iter().all(|l| l.source == ListingSource::External));
    assert!(kept.iter().all(|l| l.deadline.is_none() && l.created_at.is_none()));
}

#[test]
fn description_is_derived_per_adapter_convention() {
    let rec = raw("x-1", "Intern", "Remote", "https://x/1");

    let (two, _) = normalize(vec![rec.clone()], ListingSource::External, DescriptionStyle::TitleAtCompany);
    assert_eq!(two[0].description, "Intern at Acme");

    let (three, _) = normalize(vec![rec], ListingSource::External, DescriptionStyle::TitleAtCompanyLocation);
    assert_eq!(three[0].description, "Intern at Acme (Remote)");
}

#[test]
fn empty_company_is_allowed() {
    let mut rec = raw("nk-1", "Intern", "Remote", "https://x/1");
    rec.company = String::new();
    let (kept, rejected) = normalize(vec![rec], ListingSource::External, DescriptionStyle::TitleAtCompany);
    assert_eq!(rejected, 0);
    assert_eq!(kept[0].company, "");
    assert_eq!(kept[0].description, "Intern");
}

#[test]
fn listing_serializes_with_camel_case_and_lowercase_source() {
    let (kept, _) = normalize(
        vec![raw("is-1", "Intern", "Remote", "https://x/1")],
        ListingSource::External,
        DescriptionStyle::TitleAtCompany,
    );
    let v = serde_json::to_value(&kept[0]).unwrap();
    assert_eq!(v["source"], "external");
    assert_eq!(v["description"], "Intern at Acme");
    assert!(v.get("deadline").is_none());
    assert!(v.get("createdAt").is_none());
}
