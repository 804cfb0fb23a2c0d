//! Basalt CLI - Command line interface for the Basalt transpiler

use std::fs;
use std::path::{Path, PathBuf};

use ariadne::{Color, Label, Report, ReportKind, Source};
use clap::{Parser, Subcommand};
use walkdir::WalkDir;

use basalt_ast::{FileId, NodeIdGen, Program, Span};
use basalt_checker::{check, CheckResult, Severity};
use basalt_codegen::generate_c;
use basalt_graph::{analyze, AnalysisResult, PassingConfig};
use basalt_parser::{dependency_order, parse_file};
use basalt_symbols::{build_symbol_table, PassingMode, SymbolTable};

#[derive(Parser)]
#[command(name = "basalt")]
#[command(about = "Basalt embedded-language to C transpiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and output the AST as JSON
    Parse {
        /// Input file
        file: PathBuf,
        /// Pretty print the output
        #[arg(short, long)]
        pretty: bool,
    },
    /// Analyze files or directories without emitting C
    Check {
        /// Input files or directories
        paths: Vec<PathBuf>,
    },
    /// Transpile a program to a C translation unit
    Build {
        /// Root input file; includes are loaded relative to it
        file: PathBuf,
        /// Output file (defaults to the input with a .c extension)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Width threshold (bits) for passing unmodified scalars by value
        #[arg(long, default_value_t = 32)]
        by_value_bits: u16,
    },
    /// Show symbols and parameter passing decisions
    Info {
        /// Input file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, pretty } => cmd_parse(&file, pretty),
        Commands::Check { paths } => cmd_check(&paths),
        Commands::Build {
            file,
            output,
            by_value_bits,
        } => cmd_build(&file, output, by_value_bits),
        Commands::Info { file } => cmd_info(&file),
    }
}

/// Loaded program plus the sources ariadne needs for rendering, indexed by
/// `FileId`
struct LoadedProgram {
    program: Program,
    sources: Vec<(String, String)>,
}

impl LoadedProgram {
    fn source_of(&self, file: FileId) -> (&str, &str) {
        let (path, source) = &self.sources[file.0 as usize];
        (path.as_str(), source.as_str())
    }
}

/// Load a root file and everything it transitively includes, in dependency
/// order. Include paths resolve relative to the root file's directory.
fn load_program(root: &Path) -> Result<LoadedProgram, String> {
    let base_dir = root.parent().unwrap_or_else(|| Path::new("."));
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| format!("not a file: {}", root.display()))?;

    let mut ids = NodeIdGen::new();
    let mut sources: Vec<(String, String)> = Vec::new();
    let mut files = Vec::new();
    let mut pending = vec![root_name];
    let mut loaded: Vec<String> = Vec::new();

    while let Some(name) = pending.pop() {
        if loaded.iter().any(|l| *l == name) {
            continue;
        }
        loaded.push(name.clone());

        let disk_path = base_dir.join(&name);
        let source = fs::read_to_string(&disk_path)
            .map_err(|e| format!("error reading {}: {}", disk_path.display(), e))?;

        let file_id = FileId(sources.len() as u32);
        sources.push((name.clone(), source));
        let source_ref = &sources.last().expect("just pushed").1;

        match parse_file(source_ref, &name, file_id, &mut ids) {
            Ok(file) => {
                for include in &file.includes {
                    pending.push(include.path.clone());
                }
                files.push(file);
            }
            Err(e) => {
                report_error(&name, source_ref, e.span(), "parse error", &e.to_string());
                return Err(String::new());
            }
        }
    }

    let order = match dependency_order(&files) {
        Ok(order) => order,
        Err(e) => {
            let span = e.span();
            let (path, source) = &sources[span.file.0 as usize];
            report_error(path, source, span, "include error", &e.to_string());
            return Err(String::new());
        }
    };

    let mut slots: Vec<Option<_>> = files.into_iter().map(Some).collect();
    let ordered = order
        .into_iter()
        .map(|i| slots[i].take().expect("order indices are unique"))
        .collect();

    Ok(LoadedProgram {
        program: Program::new(ordered),
        sources,
    })
}

/// Everything the analysis pipeline produces for one program
struct PipelineOutput {
    table: SymbolTable,
    checked: CheckResult,
    analysis: AnalysisResult,
}

/// Run symbol building, checking, and mutation analysis; render every
/// fatal diagnostic and return None if any phase failed.
fn run_pipeline(loaded: &LoadedProgram, config: &PassingConfig) -> Option<PipelineOutput> {
    let table = match build_symbol_table(&loaded.program) {
        Ok(table) => table,
        Err(errors) => {
            for e in &errors {
                let span = e.span();
                let (path, source) = loaded.source_of(span.file);
                report_error(path, source, span, e.code(), &e.to_string());
            }
            return None;
        }
    };

    let checked = match check(&loaded.program, &table) {
        Ok(result) => result,
        Err(errors) => {
            for e in &errors {
                let span = e.span();
                let (path, source) = loaded.source_of(span.file);
                report_error(path, source, span, e.code(), &e.to_string());
            }
            return None;
        }
    };

    for diag in &checked.diagnostics {
        let (path, source) = loaded.source_of(diag.span.file);
        report_advisory(path, source, diag.span, diag.severity, &diag.code, &diag.message);
    }

    let analysis = match analyze(&loaded.program, &table, &checked.references, config) {
        Ok(analysis) => analysis,
        Err(e) => {
            let span = e.span();
            let (path, source) = loaded.source_of(span.file);
            report_error(path, source, span, e.code(), &e.to_string());
            return None;
        }
    };

    Some(PipelineOutput {
        table,
        checked,
        analysis,
    })
}

fn cmd_parse(file: &PathBuf, pretty: bool) {
    let loaded = match load_program(file) {
        Ok(l) => l,
        Err(e) => {
            if !e.is_empty() {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
    };

    let json = if pretty {
        serde_json::to_string_pretty(&loaded.program).expect("AST serializes")
    } else {
        serde_json::to_string(&loaded.program).expect("AST serializes")
    };
    println!("{}", json);
}

fn cmd_check(paths: &[PathBuf]) {
    let mut all_ok = true;

    for root in discover_files(paths) {
        let loaded = match load_program(&root) {
            Ok(l) => l,
            Err(e) => {
                if !e.is_empty() {
                    eprintln!("{}", e);
                }
                all_ok = false;
                continue;
            }
        };

        match run_pipeline(&loaded, &PassingConfig::default()) {
            Some(output) => {
                let fn_count = output.table.functions().count();
                println!(
                    "✓ {} - {} symbols ({} functions, {} parameters classified)",
                    root.display(),
                    output.table.len(),
                    fn_count,
                    output.analysis.decisions.len()
                );
            }
            None => {
                println!("✗ {}", root.display());
                all_ok = false;
            }
        }
    }

    if !all_ok {
        std::process::exit(1);
    }
}

fn cmd_build(file: &PathBuf, output: Option<PathBuf>, by_value_bits: u16) {
    let loaded = match load_program(file) {
        Ok(l) => l,
        Err(e) => {
            if !e.is_empty() {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
    };

    let config = PassingConfig {
        max_by_value_bits: by_value_bits,
    };
    let Some(result) = run_pipeline(&loaded, &config) else {
        std::process::exit(1);
    };

    let c_source = match generate_c(
        &loaded.program,
        &result.table,
        &result.checked.references,
        &result.checked.expr_types,
        &result.analysis.decisions,
    ) {
        Ok(c) => c,
        Err(e) => {
            let span = e.span();
            let (path, source) = loaded.source_of(span.file);
            report_error(path, source, span, "codegen error", &e.to_string());
            std::process::exit(1);
        }
    };

    let out_path = output.unwrap_or_else(|| {
        let mut p = file.clone();
        p.set_extension("c");
        p
    });
    if let Err(e) = fs::write(&out_path, &c_source) {
        eprintln!("error writing {}: {}", out_path.display(), e);
        std::process::exit(1);
    }
    println!(
        "Transpiled to {} ({} lines)",
        out_path.display(),
        c_source.lines().count()
    );
}

fn cmd_info(file: &PathBuf) {
    let loaded = match load_program(file) {
        Ok(l) => l,
        Err(e) => {
            if !e.is_empty() {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
    };

    let Some(output) = run_pipeline(&loaded, &PassingConfig::default()) else {
        std::process::exit(1);
    };

    println!("Program: {}", file.display());
    println!("  files: {}", loaded.program.files.len());
    println!("  symbols: {}", output.table.len());
    println!();

    println!("Functions:");
    for func in output.table.functions() {
        let Some(data) = func.as_function() else {
            continue;
        };
        let params: Vec<String> = data
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let mode = match output.analysis.decisions.get(func.id, i) {
                    Some(PassingMode::ByValue) => "value",
                    Some(PassingMode::ByConstPointer) => "const-ref",
                    Some(PassingMode::ByMutablePointer) => "mut-ref",
                    None => "?",
                };
                format!("{}: {} [{}]", p.name, p.ty.display(), mode)
            })
            .collect();
        println!(
            "  {}({}) -> {}",
            func.qualified_name,
            params.join(", "),
            data.return_type.display()
        );
    }
}

/// Expand directory arguments into the .blt files they contain
fn discover_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.path().extension().and_then(|e| e.to_str()) == Some("blt") {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }
    files
}

fn report_error(path: &str, source: &str, span: Span, code: &str, message: &str) {
    Report::build(ReportKind::Error, path.to_string(), span.start)
        .with_code(code)
        .with_message(message)
        .with_label(
            Label::new((path.to_string(), span.start..span.end.max(span.start + 1)))
                .with_message(message)
                .with_color(Color::Red),
        )
        .finish()
        .eprint((path.to_string(), Source::from(source)))
        .ok();
}

fn report_advisory(
    path: &str,
    source: &str,
    span: Span,
    severity: Severity,
    code: &str,
    message: &str,
) {
    let (kind, color) = match severity {
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
        Severity::Info | Severity::Hint => (ReportKind::Advice, Color::Cyan),
    };
    Report::build(kind, path.to_string(), span.start)
        .with_code(code)
        .with_message(message)
        .with_label(
            Label::new((path.to_string(), span.start..span.end.max(span.start + 1)))
                .with_message(message)
                .with_color(color),
        )
        .finish()
        .eprint((path.to_string(), Source::from(source)))
        .ok();
}
