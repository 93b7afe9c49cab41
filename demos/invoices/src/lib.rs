pub mod data;

pub use data::{invoice, invoices, line, revise};
