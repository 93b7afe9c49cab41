use rowstitch::*;

fn seeded(i: i64) -> Invoice {
    // invoices 7 and 8 share a creation stamp so descending orders have a tie
    let minute = if i == 8 { 7 } else { i };
    let created_at = DateTime::from_timestamp(1_700_000_000 + minute * 60, 0).unwrap();
    Invoice {
        number: i.to_string(),
        due_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        total: BigDecimal::from(100 + i),
        paid: None,
        canceled: false,
        version: i,
        tax: BigDecimal::from(15),
        reference: None,
        created_at,
        modified_at: created_at,
        lines: (0..i % 3)
            .map(|j| LineItem {
                product: format!("prod {i} - {j}"),
                cost: BigDecimal::from(10 + j),
                quantity: 1,
                tax_group: BigDecimal::from(5),
                discount: BigDecimal::from(0),
            })
            .collect(),
    }
}

fn seeded_store() -> MemStore {
    let store = MemStore::new();
    let invoices: Vec<Invoice> = (1..=12).map(seeded).collect();
    SyncWriter::new(store.clone()).insert(&invoices).expect("Failed to insert");
    store
}

fn numbers(invoices: &[Invoice]) -> Vec<String> {
    invoices.iter().map(|invoice| invoice.number.clone()).collect()
}

#[test]
fn it_should_fetch_one_shape_by_exact_key_with_lines_stitched() {
    let assembler = ReportAssembler::new(seeded_store());
    let found = assembler.fetch(&ReportShape::One("5".to_string())).expect("Failed to fetch");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], seeded(5));
    assert_eq!(found[0].lines.len(), 2);
}

#[test]
fn it_should_fetch_the_key_set_shape_in_key_order() {
    let assembler = ReportAssembler::new(seeded_store());
    let keys = vec!["6".to_string(), "2".to_string(), "4".to_string()];
    let found = assembler.fetch(&ReportShape::Many(keys)).expect("Failed to fetch");
    assert_eq!(numbers(&found), vec!["2", "4", "6"]);
}

#[test]
fn it_should_pick_the_oldest_at_or_above_the_version_bound() {
    let assembler = ReportAssembler::new(seeded_store());
    let found = assembler.fetch(&ReportShape::FirstSince(3)).expect("Failed to fetch");
    assert_eq!(numbers(&found), vec!["3"]);
}

#[test]
fn it_should_pick_the_newest_at_or_below_the_version_bound() {
    let assembler = ReportAssembler::new(seeded_store());
    let found = assembler.fetch(&ReportShape::LastUntil(9)).expect("Failed to fetch");
    assert_eq!(numbers(&found), vec!["9"]);
}

#[test]
fn it_should_cap_the_window_at_five_oldest_ascending() {
    let assembler = ReportAssembler::new(seeded_store());
    let found = assembler.fetch(&ReportShape::TopInWindow(3, 9)).expect("Failed to fetch");
    assert_eq!(numbers(&found), vec!["3", "4", "5", "6", "7"]);
}

#[test]
fn it_should_cap_the_window_at_ten_newest_descending_with_key_tiebreak() {
    let assembler = ReportAssembler::new(seeded_store());
    let found = assembler.fetch(&ReportShape::BottomInWindow(3, 9)).expect("Failed to fetch");
    assert_eq!(numbers(&found), vec!["9", "8", "7", "6", "5", "4", "3"]);
}

#[test]
fn it_should_assemble_all_six_shapes_against_one_store() {
    let assembler = ReportAssembler::new(seeded_store());
    let keys = vec!["2".to_string(), "4".to_string()];
    let report = assembler.assemble("5", &keys, 3, 9).expect("Failed to assemble");

    assert_eq!(report.one, Some(seeded(5)));
    assert_eq!(numbers(&report.many), vec!["2", "4"]);
    assert_eq!(report.first, Some(seeded(3)));
    assert_eq!(report.last, Some(seeded(9)));
    assert_eq!(numbers(&report.top), vec!["3", "4", "5", "6", "7"]);
    assert_eq!(numbers(&report.bottom), vec!["9", "8", "7", "6", "5", "4", "3"]);
}

#[test]
fn it_should_search_everything_in_lexicographic_key_order() {
    let reader = StitchReader::new(seeded_store());
    let found = reader.fetch_many(HeaderQuery::all()).expect("Failed to fetch");
    assert_eq!(
        numbers(&found),
        vec!["1", "10", "11", "12", "2", "3", "4", "5", "6", "7", "8", "9"]
    );
}

#[test]
fn it_should_search_a_version_window_in_key_order() {
    let reader = StitchReader::new(seeded_store());
    let found = reader.fetch_many(HeaderQuery::version_window(2, 5)).expect("Failed to fetch");
    assert_eq!(numbers(&found), vec!["2", "3", "4", "5"]);
    assert!(found.iter().all(|invoice| (2..=5).contains(&invoice.version)));
}
