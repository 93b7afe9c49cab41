use std::error::Error;
use std::time::Instant;

use invoices::data;
use rowstitch::{error, info};
use rowstitch::{HeaderQuery, MemStore, RedbStore, ReportAssembler, StitchReader, Store, SyncWriter};

/// One full round against a store: clean, insert, revise and update, then
/// every read shape, then a targeted delete.
fn drive<S: Store + Clone>(label: &str, store: S, count: i64) -> Result<(), Box<dyn Error>> {
    let writer = SyncWriter::new(store.clone());
    let reader = StitchReader::new(store.clone());
    let assembler = ReportAssembler::new(store);

    writer.delete_all()?;
    let mut batch = data::invoices(count);

    let start = Instant::now();
    writer.insert(&batch)?;
    info!("[{}] inserted {} aggregates in {:?}", label, count, start.elapsed());

    data::revise(&mut batch);
    let start = Instant::now();
    writer.update(&mut batch)?;
    info!("[{}] updated {} aggregates in {:?}", label, count, start.elapsed());

    let key = (count / 2).max(1).to_string();
    let start = Instant::now();
    let one = reader.fetch_one(&key)?;
    info!("[{}] fetched invoice {} in {:?}", label, key, start.elapsed());

    let start = Instant::now();
    let window = reader.fetch_many(HeaderQuery::version_window(1, 10))?;
    info!("[{}] version window [1, 10] holds {} aggregates, fetched in {:?}", label, window.len(), start.elapsed());

    let start = Instant::now();
    let all = reader.fetch_many(HeaderQuery::all())?;
    info!("[{}] search all stitched {} aggregates in {:?}", label, all.len(), start.elapsed());

    let keys: Vec<String> = (1..=count.min(5)).map(|i| i.to_string()).collect();
    let start = Instant::now();
    let report = assembler.assemble(&key, &keys, 1, count)?;
    info!(
        "[{}] report: one={}, many={}, first={}, last={}, top={}, bottom={}, took {:?}",
        label,
        report.one.is_some(),
        report.many.len(),
        report.first.is_some(),
        report.last.is_some(),
        report.top.len(),
        report.bottom.len(),
        start.elapsed()
    );

    if let Some(invoice) = one {
        info!("[{}] sample aggregate:\n{}", label, serde_json::to_string_pretty(&invoice)?);
    }

    writer.delete(&keys)?;
    info!("[{}] deleted aggregates {:?}", label, keys);
    Ok(())
}

/// Which stores a run drives, from the first argument: (memory, redb).
fn backend_flags(backend: &str) -> Option<(bool, bool)> {
    match backend {
        "all" => Some((true, true)),
        "memory" => Some((true, false)),
        "redb" => Some((false, true)),
        _ => None,
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let backend = args.get(1).map(String::as_str).unwrap_or("all");
    let count = args.get(2).and_then(|arg| arg.parse().ok()).unwrap_or(1_000);
    let (memory, redb) = match backend_flags(backend) {
        Some(flags) => flags,
        None => {
            error!("unknown backend {}, expected memory, redb or all", backend);
            std::process::exit(2);
        }
    };
    if memory {
        if let Err(e) = drive("memory", MemStore::new(), count) {
            error!("memory round failed: {}", e);
            std::process::exit(1);
        }
    }
    if redb {
        let store = match RedbStore::temp("invoices_demo") {
            Ok(store) => store,
            Err(e) => {
                error!("could not open the redb database: {}", e);
                std::process::exit(1);
            }
        };
        if let Err(e) = drive("redb", store, count) {
            error!("redb round failed: {}", e);
            std::process::exit(1);
        }
    }
}
