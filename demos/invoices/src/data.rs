//! Deterministic sample invoices for the driver and the benchmarks.

use rowstitch::chrono::Duration;
use rowstitch::{BigDecimal, DateTime, Invoice, LineItem, NaiveDate};

const BASE_TIMESTAMP: i64 = 1_678_296_000;

pub fn invoices(count: i64) -> Vec<Invoice> {
    (1..=count).map(invoice).collect()
}

pub fn invoice(i: i64) -> Invoice {
    let created_at = DateTime::from_timestamp(BASE_TIMESTAMP + i, 0).expect("sample timestamp in range");
    Invoice {
        number: i.to_string(),
        due_date: NaiveDate::from_ymd_opt(2023, 3, 8).expect("sample date in range") + Duration::days(i / 2),
        total: BigDecimal::from(100 + i),
        paid: (i % 3 == 0).then(|| created_at + Duration::hours(1)),
        canceled: i % 5 == 0,
        version: i,
        tax: BigDecimal::from(15 + i % 10),
        reference: (i % 7 == 0).then(|| format!("order {i}")),
        created_at,
        modified_at: created_at,
        lines: (0..i % 10).map(|j| line(i, j)).collect(),
    }
}

pub fn line(i: i64, j: i64) -> LineItem {
    LineItem {
        product: format!("prod {i} - {j}"),
        cost: BigDecimal::from((i + j * j) / 100),
        quantity: (i / 100 + j / 2 + 1) as i32,
        tax_group: BigDecimal::from(5 + i % 20),
        discount: if i % 3 == 0 { BigDecimal::from(i % 10 + 5) } else { BigDecimal::from(0) },
    }
}

/// The in-memory mutation round the update pass persists: pays the first
/// third, renames their first product and reshapes every line list so the
/// overwrite, append and truncate paths all get exercised.
pub fn revise(invoices: &mut [Invoice]) {
    let third = invoices.len() / 3;
    for (position, invoice) in invoices.iter_mut().enumerate() {
        if position < third {
            invoice.paid = Some(invoice.created_at + Duration::hours(2));
            if let Some(first) = invoice.lines.first_mut() {
                first.product.push_str(" !");
            }
        }
        match position % 3 {
            0 => {
                let half = invoice.lines.len() / 2;
                invoice.lines.truncate(half);
            }
            1 => {
                let next = invoice.lines.len() as i64;
                invoice.lines.push(line(position as i64 + 1, next));
            }
            _ => {}
        }
    }
}
