// Interactive dashboard console.
//
// Option [1] loads the readings export, the filter options narrow the view
// the way the web dashboard's dropdowns and cards do, and option [8]
// writes the detail table, regional rollup and JSON summary to disk.
use std::io::{self, Write};
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use water_dashboard::aggregate::{aggregate, in_bucket, BucketTable};
use water_dashboard::config::{load_config, DashboardConfig};
use water_dashboard::filter::{FilterState, ALL};
use water_dashboard::loader::load_records;
use water_dashboard::output;
use water_dashboard::paginate::Pager;
use water_dashboard::reports;
use water_dashboard::types::{Metric, Record};
use water_dashboard::util;

/// Everything one console session works on, passed explicitly to each
/// handler.
struct Session {
    config: DashboardConfig,
    records: Option<Vec<Record>>,
    filter: FilterState,
    metric: Metric,
    pager: Pager,
}

impl Session {
    fn new(config: DashboardConfig) -> Self {
        let filter = config.filter_state();
        let pager = Pager::new(config.page_size);
        let metric = match config.record_kind {
            water_dashboard::RecordKind::Village => Metric::Lpcd,
            _ => Metric::Chlorine,
        };
        Self {
            config,
            records: None,
            filter,
            metric,
            pager,
        }
    }

    fn table(&self) -> Option<&BucketTable> {
        self.config.dashboard(self.metric)
    }

    /// Records behind the current view: filter first, then the selected
    /// card, if any.
    fn view(&self) -> Vec<&Record> {
        let Some(records) = self.records.as_deref() else {
            return Vec::new();
        };
        let filtered = self.filter.apply(records);
        match (self.filter.selected_bucket(), self.table()) {
            (Some(bucket), Some(table)) => in_bucket(filtered, table, bucket),
            _ => filtered,
        }
    }
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Print a numbered list and return the picked index. `[0]` is offered as
/// `zero_label` and maps to `Some(None)`; invalid input maps to `None`.
fn pick(options: &[String], zero_label: &str) -> Option<Option<usize>> {
    println!("[0] {}", zero_label);
    for (i, opt) in options.iter().enumerate() {
        println!("[{}] {}", i + 1, opt);
    }
    match read_choice().parse::<usize>() {
        Ok(0) => Some(None),
        Ok(n) if n <= options.len() => Some(Some(n - 1)),
        _ => {
            println!("Invalid choice.\n");
            None
        }
    }
}

fn require_data(session: &Session) -> bool {
    if session.records.is_none() {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return false;
    }
    true
}

fn handle_load(session: &mut Session) {
    let path = session.config.data_path.clone();
    match load_records(&path, session.config.record_kind, &session.config.status_columns) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} loaded)",
                util::format_int(report.total_rows),
                util::format_int(report.loaded_rows)
            );
            if report.parse_errors > 0 {
                println!(
                    "Note: {} rows skipped due to parse/validation errors.",
                    util::format_int(report.parse_errors)
                );
            }
            if report.empty_series > 0 {
                println!(
                    "Info: {} rows have no readings in the last 7 days.",
                    util::format_int(report.empty_series)
                );
            }
            println!();
            session.records = Some(data);
            session.pager.reset();
        }
        Err(e) => {
            error!(path = %path, error = %e, "load failed");
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

fn handle_choose_dashboard(session: &mut Session) {
    let metrics: Vec<Metric> = session.config.dashboards.iter().map(|d| d.metric).collect();
    let titles: Vec<String> = session
        .config
        .dashboards
        .iter()
        .map(|d| d.title.clone())
        .collect();
    if let Some(Some(i)) = pick(&titles, "Keep current") {
        session.metric = metrics[i];
        // Bucket names differ between dashboards.
        session.filter.select_bucket(None);
        session.pager.reset();
        println!("Dashboard: {}\n", titles[i]);
    }
}

fn handle_geo_filter(session: &mut Session) {
    if !require_data(session) {
        return;
    }
    let levels = session.filter.hierarchy().levels().to_vec();
    let Some(Some(li)) = pick(&levels, "Back") else {
        return;
    };
    let level = &levels[li];
    let options = match &session.records {
        Some(records) => session.filter.options(records, level),
        None => Vec::new(),
    };
    println!("Select {}:", level);
    match pick(&options, "All") {
        Some(Some(vi)) => session.filter.set_level(level, options[vi].clone()),
        Some(None) => session.filter.set_level(level, ALL),
        None => return,
    }
    println!("Current level: {}\n", session.filter.current_level());
}

fn handle_status_filter(session: &mut Session) {
    let fields = session.config.status_columns.clone();
    let Some(Some(fi)) = pick(&fields, "Back") else {
        return;
    };
    let field = &fields[fi];
    let value = prompt(&format!("Value for {} (blank for all): ", field));
    let value = if value.is_empty() { ALL.to_string() } else { value };
    let forced = session.filter.set_status_filter_constrained(field, value);
    for (f, v) in forced {
        println!("Note: {} set to {}", f, v);
    }
    println!();
}

fn handle_select_card(session: &mut Session) {
    let Some(table) = session.table() else {
        println!("No dashboard configured for {}.\n", session.metric);
        return;
    };
    let buckets: Vec<(String, String)> = table
        .thresholds
        .buckets()
        .into_iter()
        .map(|b| (b.bucket, b.label))
        .chain(table.consistency.iter().map(|c| (c.bucket.clone(), c.label.clone())))
        .collect();
    let labels: Vec<String> = buckets.iter().map(|(_, l)| l.clone()).collect();
    match pick(&labels, "No card (show all)") {
        Some(Some(i)) => session.filter.select_bucket(Some(buckets[i].0.clone())),
        Some(None) => session.filter.select_bucket(None),
        None => return,
    }
    session.pager.reset();
    println!();
}

fn handle_show_cards(session: &Session) {
    if !require_data(session) {
        return;
    }
    let (Some(records), Some(table)) = (session.records.as_deref(), session.table()) else {
        return;
    };
    let filtered = session.filter.apply(records);
    let cards = aggregate(filtered.iter().copied(), table);
    println!("{} ({})", table.title, table.unit);
    println!(
        "Level: {} | Records: {} of {}\n",
        session.filter.current_level(),
        util::format_int(filtered.len()),
        util::format_int(records.len())
    );
    println!("{}\n", output::render_cards(&cards));
}

fn handle_show_records(session: &mut Session) {
    if !require_data(session) {
        return;
    }
    let Some(table) = session.table().cloned() else {
        return;
    };
    let rows = reports::detail_rows(&session.view(), &table);
    loop {
        let page = session.pager.slice(&rows);
        println!(
            "Page {} of {} ({} records)",
            page.page,
            page.total_pages.max(1),
            util::format_int(page.total_items)
        );
        output::preview_table_rows(page.items, page.items.len());
        match prompt("[n] next, [p] previous, [enter] back: ").as_str() {
            "n" | "N" => {
                if !session.pager.next() {
                    println!("Already on the last page.");
                }
            }
            "p" | "P" => {
                if !session.pager.prev() {
                    println!("Already on the first page.");
                }
            }
            _ => break,
        }
    }
    println!();
}

fn handle_export(session: &Session) {
    if !require_data(session) {
        return;
    }
    let (Some(records), Some(table)) = (session.records.as_deref(), session.table()) else {
        return;
    };
    let prefix = table.metric.column_prefix();
    println!("Generating reports...");
    println!("Outputs saved to individual files...\n");

    let filtered = session.filter.apply(records);
    let view = session.view();
    let detail = reports::detail_rows(&view, table);
    let file1 = format!("{}_detail.csv", prefix);
    if let Err(e) = output::write_csv(&file1, &detail) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 1: {} Detail\n", table.title);
    output::preview_table_rows(&detail, 3);
    println!("(Full table exported to {})\n", file1);

    let rollup = reports::rollup(&filtered, &session.filter, table);
    let file2 = format!("{}_rollup.csv", prefix);
    if let Err(e) = output::write_rollup_csv(&file2, &rollup) {
        eprintln!("Write error: {}", e);
    }
    println!("Report 2: {} Rollup by {}\n", table.title, rollup.level);
    output::preview_rollup(&rollup, 5);
    println!("(Full table exported to {})\n", file2);

    let summary = reports::summary(records.len(), &filtered, &session.filter, table);
    let file3 = format!("{}_summary.json", prefix);
    if let Err(e) = output::write_json(&file3, &summary) {
        eprintln!("Write error: {}", e);
    }
    println!(
        "Summary Stats ({}): {} of {} records, average latest {}\n",
        file3,
        util::format_int(summary.filtered_records),
        util::format_int(summary.total_records),
        util::format_reading(summary.avg_latest, 2)
    );
}

fn print_menu(session: &Session) {
    println!("Water Dashboard [{}]", session.metric);
    println!("[1] Load the file");
    println!("[2] Choose dashboard");
    println!("[3] Set geographic filter");
    println!("[4] Set status filter");
    println!("[5] Select card");
    println!("[6] Show cards");
    println!("[7] Show records");
    println!("[8] Generate reports");
    println!("[9] Clear filters");
    println!("[0] Exit\n");
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("water_dashboard=info")),
        )
        .with_target(false)
        .init();

    let config = match load_config() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "configuration rejected");
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(data_path = %config.data_path, page_size = config.page_size, "configuration loaded");

    let mut session = Session::new(config);
    loop {
        print_menu(&session);
        match read_choice().as_str() {
            "1" => handle_load(&mut session),
            "2" => handle_choose_dashboard(&mut session),
            "3" => handle_geo_filter(&mut session),
            "4" => handle_status_filter(&mut session),
            "5" => handle_select_card(&mut session),
            "6" => handle_show_cards(&session),
            "7" => handle_show_records(&mut session),
            "8" => handle_export(&session),
            "9" => {
                session.filter.clear();
                session.pager.reset();
                println!("Filters cleared.\n");
            }
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-9.\n"),
        }
    }
    ExitCode::SUCCESS
}
