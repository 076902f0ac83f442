use anyhow::{Context, bail};
use cpu6502_gen::dialect::DialectKind;
use cpu6502_gen::generator::{Generator, Section};
use cpu6502_gen::opcode::OpcodeMap;
use cpu6502_gen::operation::OperationCatalog;
use cpu6502_gen::table;
use cpu6502_gen::verifier::{verify, verify_with_map};
use std::fs;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use table_roundtrip::{Expected, TableCase};

const DIALECTS: [DialectKind; 2] = [DialectKind::Cpp, DialectKind::Rust];

fn main() -> anyhow::Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("cases"));

    let map = table::load_standard()?;
    check("built-in 6502/65C02 table", &map, None)?;

    for table_case in collect_table_cases(&dir)? {
        let map = table_case.opcode_map()?;
        check(&table_case.name, &map, Some(table_case.expected))?;
    }

    Ok(())
}

fn collect_table_cases(path: impl AsRef<Path>) -> anyhow::Result<Vec<TableCase>> {
    let path = path.as_ref();
    let ctx = path.display().to_string();

    let mut paths = vec![];
    for e in fs::read_dir(path).context(ctx.clone())? {
        let path = e.context(ctx.clone())?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .iter()
        .map(|path| -> anyhow::Result<TableCase> {
            let file = File::open(path).context(path.display().to_string())?;
            serde_json::from_reader(BufReader::new(file)).context(path.display().to_string())
        })
        .collect()
}

fn check(name: &str, map: &OpcodeMap, expected: Option<Expected>) -> anyhow::Result<()> {
    for dialect in DIALECTS {
        let ctx = format!("{name} ({dialect})");
        let generator = Generator::new(dialect.dialect(), OperationCatalog::standard());
        let text = generator.render(map, Section::All).context(ctx.clone())?;
        if generator.render(map, Section::All).context(ctx.clone())? != text {
            bail!("{ctx}: output differs between runs");
        }

        let report = verify(&text).context(ctx.clone())?;
        let by_map = verify_with_map(&text, map).context(ctx.clone())?;
        if report != by_map {
            bail!("{ctx}: comments and table disagree: {report:?} vs {by_map:?}");
        }
        if !report.is_clean() {
            bail!("{ctx}: unknown addressing modes {:?}", report.unknown);
        }
        if report.cases != map.len() {
            bail!("{ctx}: {} cases for {} opcodes", report.cases, map.len());
        }
        if let Some(expected) = expected {
            let actual = Expected {
                cases: report.cases,
                matched: report.matched,
            };
            if actual != expected {
                bail!("{ctx}: expected={expected:?}, actual={actual:?}");
            }
        }
        println!(
            "Table Case: {ctx} => OK ({} cases, {} matched)",
            report.cases, report.matched
        );
    }
    Ok(())
}
