//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

mod theme;

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use tabplan::{
    normalize_table_name, Config, Executor, OperationOutcome, OperationResult, PlanOutcome,
    Registry, Relation, ResultEntry,
};

#[derive(Parser)]
#[command(
    name = "tabplan",
    version,
    about = "Profile CSV tables and run declarative aggregation plans"
)]
struct Args {
    /// JSON config file (profile/exec settings)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print schema metadata for the given CSV files as JSON
    Profile {
        /// CSV files; each registers under its normalized file name
        files: Vec<PathBuf>,
        /// Rows kept in the head/tail samples
        #[arg(long)]
        sample_rows: Option<usize>,
    },
    /// Execute a JSON aggregation plan against the given CSV files
    Run {
        /// Plan file
        #[arg(short, long)]
        plan: PathBuf,
        /// CSV files; the first one is the fallback table
        files: Vec<PathBuf>,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
        /// Run independent operations in parallel
        #[arg(long)]
        parallel: bool,
        /// Show execution time
        #[arg(short, long)]
        timer: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path).unwrap_or_else(|e| fail(&format!("{}: {e}", path.display()))),
        None => Config::default(),
    };

    match args.command {
        Command::Profile { files, sample_rows } => {
            if let Some(n) = sample_rows {
                config.profile.sample_rows = n;
            }
            let tables = load_tables(&files);
            let metadata = tabplan::profile(&tables, &config.profile);
            match metadata.to_json_pretty() {
                Ok(json) => println!("{json}"),
                Err(e) => fail(&e.to_string()),
            }
        }
        Command::Run {
            plan,
            files,
            format,
            parallel,
            timer,
        } => {
            config.exec.parallel |= parallel;
            let tables = load_tables(&files);
            let text = std::fs::read_to_string(&plan)
                .unwrap_or_else(|e| fail(&format!("{}: {e}", plan.display())));
            let plan: serde_json::Value = serde_json::from_str(&text)
                .unwrap_or_else(|e| fail(&format!("{}: {e}", plan.display())));

            let start = std::time::Instant::now();
            let outcome = Executor::new(&tables)
                .with_config(config.exec.clone())
                .execute(&plan);
            let elapsed = start.elapsed();

            match format {
                OutputFormat::Json => match serde_json::to_string_pretty(&outcome) {
                    Ok(json) => println!("{json}"),
                    Err(e) => fail(&e.to_string()),
                },
                OutputFormat::Table => print_outcome(&outcome),
            }
            if timer {
                println!("{}", theme::footer().paint(format!("Run Time: {elapsed:.3?}")));
            }
            if !outcome.success {
                std::process::exit(1);
            }
        }
    }
}

fn fail(msg: &str) -> ! {
    eprintln!("{}", theme::error().paint(format!("Error: {msg}")));
    std::process::exit(1);
}

fn load_tables(files: &[PathBuf]) -> Registry {
    if files.is_empty() {
        fail("no CSV files given");
    }
    let mut tables = Registry::new();
    for path in files {
        let rel = Relation::read_csv(path)
            .unwrap_or_else(|e| fail(&format!("{}: {e}", path.display())));
        tables.register(table_name_for(path), rel);
    }
    tables
}

fn table_name_for(path: &Path) -> String {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize_table_name(&file)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_outcome(outcome: &PlanOutcome) {
    for (key, entry) in &outcome.results {
        match entry {
            ResultEntry::Operation(op) => print_operation(key, op),
            ResultEntry::Steps(steps) => {
                for (step, op) in steps {
                    print_operation(&format!("{key}.{step}"), op);
                }
            }
        }
    }
    if let Some(e) = &outcome.error {
        eprintln!("{}", theme::error().paint(format!("Plan failed: {e}")));
    }
    let s = &outcome.execution_metadata;
    let failed = outcome.error_count();
    let style = if outcome.success && failed == 0 {
        theme::success()
    } else {
        theme::warning()
    };
    println!(
        "{}",
        style.paint(format!(
            "{} tables, {} operations ({failed} failed), {} rows processed",
            s.tables_processed, s.operations_executed, s.total_rows_processed
        ))
    );
}

fn print_operation(key: &str, op: &OperationOutcome) {
    match op {
        OperationOutcome::Success(res) => {
            println!(
                "{} {}",
                theme::title().paint(key),
                theme::footer().paint(format!("({})", res.summary.operation))
            );
            for w in &res.summary.warnings {
                println!("{}", theme::warning().paint(format!("warning: {w}")));
            }
            print_table(res);
        }
        OperationOutcome::Failure { error } => {
            println!(
                "{} {}",
                theme::title().paint(key),
                theme::error().paint(format!("error: {error}"))
            );
        }
    }
    println!();
}

const HEAD_ROWS: usize = 20;
const TAIL_ROWS: usize = 20;

fn format_cell(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if !n.is_i64() && !n.is_u64() => {
                let s = format!("{f:.6}");
                let s = s.trim_end_matches('0');
                if s.ends_with('.') {
                    format!("{s}0")
                } else {
                    s.to_string()
                }
            }
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn print_table(res: &OperationResult) {
    let cols = &res.summary.columns;
    let ncols = cols.len();
    let nrows = res.data.len();
    if ncols == 0 {
        println!("{}", theme::footer().paint("(empty result)"));
        return;
    }

    let show_dots = nrows > HEAD_ROWS + TAIL_ROWS;
    let shown: Vec<usize> = if show_dots {
        (0..HEAD_ROWS).chain(nrows - TAIL_ROWS..nrows).collect()
    } else {
        (0..nrows).collect()
    };

    let mut cells: Vec<Vec<String>> = Vec::with_capacity(shown.len());
    let mut is_null: Vec<Vec<bool>> = Vec::with_capacity(shown.len());
    let mut is_right = vec![false; ncols];
    for &r in &shown {
        let record = &res.data[r];
        let mut row = Vec::with_capacity(ncols);
        let mut nulls = Vec::with_capacity(ncols);
        for (c, name) in cols.iter().enumerate() {
            let v = record.get(name).unwrap_or(&serde_json::Value::Null);
            is_right[c] |= v.is_number();
            nulls.push(v.is_null());
            row.push(format_cell(v));
        }
        cells.push(row);
        is_null.push(nulls);
    }

    let footer_left = if show_dots {
        format!("{nrows} rows ({} shown)", shown.len())
    } else {
        format!("{nrows} rows")
    };
    let footer_right = format!("{ncols} columns");
    let footer_min = footer_left.len() + footer_right.len() + 3;

    let mut w: Vec<usize> = (0..ncols)
        .map(|c| {
            cells
                .iter()
                .map(|row| row[c].chars().count())
                .fold(cols[c].chars().count(), usize::max)
        })
        .collect();
    let mut inner_width: usize = w.iter().map(|x| x + 2).sum::<usize>() + ncols - 1;
    if inner_width < footer_min {
        let extra = footer_min - inner_width;
        w[ncols - 1] += extra;
        inner_width += extra;
    }

    let border = theme::border();
    let bar = border.paint("\u{2502}").to_string();
    let mut out = String::with_capacity(4096);

    let hline = |out: &mut String, left: char, mid: char, right: char| {
        let mut buf = String::new();
        buf.push(left);
        for c in 0..ncols {
            if c > 0 {
                buf.push(mid);
            }
            buf.extend(std::iter::repeat('\u{2500}').take(w[c] + 2));
        }
        buf.push(right);
        let _ = writeln!(out, "{}", border.paint(buf));
    };

    hline(&mut out, '\u{250c}', '\u{252c}', '\u{2510}');
    for (c, name) in cols.iter().enumerate() {
        let _ = write!(
            out,
            "{bar} {} ",
            theme::header().paint(format!("{name:^width$}", width = w[c]))
        );
    }
    let _ = writeln!(out, "{bar}");
    hline(&mut out, '\u{251c}', '\u{253c}', '\u{2524}');

    for (ri, row) in cells.iter().enumerate() {
        if show_dots && ri == HEAD_ROWS {
            for width in &w {
                let dots = format!("{:^width$}", "\u{00b7}\u{00b7}\u{00b7}", width = *width);
                let _ = write!(out, "{bar} {} ", theme::footer().paint(dots));
            }
            let _ = writeln!(out, "{bar}");
        }
        for c in 0..ncols {
            let cell = if is_null[ri][c] {
                theme::null()
                    .paint(format!("{:>width$}", row[c], width = w[c]))
                    .to_string()
            } else if is_right[c] {
                format!("{:>width$}", row[c], width = w[c])
            } else {
                format!("{:<width$}", row[c], width = w[c])
            };
            let _ = write!(out, "{bar} {cell} ");
        }
        let _ = writeln!(out, "{bar}");
    }

    hline(&mut out, '\u{251c}', '\u{2534}', '\u{2524}');
    let pad = inner_width - footer_left.len() - footer_right.len() - 2;
    let _ = writeln!(
        out,
        "{bar} {} {bar}",
        theme::footer().paint(format!("{footer_left}{:pad$}{footer_right}", ""))
    );
    let mut bottom = String::from('\u{2514}');
    bottom.extend(std::iter::repeat('\u{2500}').take(inner_width));
    bottom.push('\u{2518}');
    let _ = writeln!(out, "{}", border.paint(bottom));

    // Single write to stdout avoids per-line flushes on terminals
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    let _ = lock.write_all(out.as_bytes());
}
