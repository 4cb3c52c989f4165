//! pinfo - read Info documentation from the command line

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde::Serialize;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

use pinfo::infopath::{self, AproposMatch};
use pinfo::{
    CrossReference, Direction, Document, MenuEntry, Node, NodeRef, SearchScope, Session, config,
};

#[derive(Parser)]
#[command(name = "pinfo")]
#[command(version, about = "Read Info documents", long_about = None)]
#[command(after_help = "EXAMPLES:
    pinfo make                      Show the top node of the make manual
    pinfo make Rules                Follow the Rules menu item
    pinfo -f ./sample.info -n Intro Show one node of a local file
    pinfo -w sed                    Print where the sed manual is installed
    pinfo -i regexp sed             Go to the sed index entry for regexp
    pinfo -k regexp                 List index entries about regexp in every manual")]
struct Cli {
    /// Info file to read, by name or path
    #[arg(short, long, value_name = "FILE")]
    file: Option<String>,

    /// Node to show (may be repeated)
    #[arg(short, long = "node", value_name = "NODE")]
    nodes: Vec<String>,

    /// Write output to this file instead of stdout
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Also show every node reachable through menus
    #[arg(long)]
    subnodes: bool,

    /// Print the location of the Info file and exit
    #[arg(short = 'w', long = "where")]
    where_: bool,

    /// Print nodes as JSON
    #[arg(long)]
    json: bool,

    /// Show the first node matching a search pattern
    #[arg(short, long, value_name = "PATTERN")]
    search: Option<String>,

    /// Go to the node an index entry for TOPIC points at
    #[arg(short, long = "index-search", value_name = "TOPIC")]
    index_search: Option<String>,

    /// List the index entries for TOPIC in every manual
    #[arg(short = 'k', long, value_name = "TOPIC")]
    apropos: Option<String>,

    /// Additional directory to search for manuals (may be repeated)
    #[arg(short = 'd', long = "directory", value_name = "DIR")]
    directories: Vec<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Menu items to follow from the initial node
    #[arg(value_name = "MENU-ITEM")]
    menu_items: Vec<String>,
}

#[derive(Serialize)]
struct NodeView<'a> {
    file: Option<&'a str>,
    node: &'a str,
    next: Option<&'a NodeRef>,
    prev: Option<&'a NodeRef>,
    up: Option<&'a NodeRef>,
    menu: &'a [MenuEntry],
    xrefs: &'a [CrossReference],
    body: &'a str,
}

impl<'a> From<&'a Node> for NodeView<'a> {
    fn from(node: &'a Node) -> Self {
        NodeView {
            file: node.file(),
            node: node.name(),
            next: node.next(),
            prev: node.prev(),
            up: node.up(),
            menu: node.menu(),
            xrefs: node.xrefs(),
            body: node.body(),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("pinfo: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    let log_config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    let _ = TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn run(mut cli: Cli) -> Result<(), String> {
    let config = config::load_config().map_err(|e| e.to_string())?;
    let mut dirs = cli.directories.clone();
    dirs.extend(infopath::search_dirs(&config));

    if let Some(topic) = &cli.apropos {
        let matches = infopath::apropos(topic, &dirs).map_err(|e| e.to_string())?;
        if matches.is_empty() {
            return Err(format!("no index entries found for {topic:?}"));
        }
        let mut out = open_output(cli.output.as_ref())?;
        write_apropos(&mut out, &matches, cli.json).map_err(|e| e.to_string())?;
        return out.flush().map_err(|e| e.to_string());
    }

    // `pinfo make Rules`: the first word names the manual when no file is
    // given and a manual by that name exists.
    let name = match cli.file.take() {
        Some(file) => file,
        None if !cli.menu_items.is_empty()
            && infopath::locate(&cli.menu_items[0], &dirs).is_some() =>
        {
            cli.menu_items.remove(0)
        }
        None => "dir".to_string(),
    };
    let path = infopath::locate(&name, &dirs)
        .ok_or_else(|| format!("no manual named {name:?} found"))?;

    if cli.where_ {
        println!("{}", path.display());
        return Ok(());
    }

    let document = Arc::new(Document::open(&path).map_err(|e| e.to_string())?);
    for diagnostic in document.diagnostics() {
        log::warn!("{}: {diagnostic}", path.display());
    }
    let mut session = Session::with_options(Arc::clone(&document), config.search_options())
        .map_err(|e| e.to_string())?;

    let mut selected = Vec::new();
    if cli.nodes.is_empty() {
        for item in &cli.menu_items {
            session.select_menu_item(item.as_str()).map_err(|e| e.to_string())?;
        }
        if let Some(topic) = &cli.index_search {
            session.index_search(topic).map_err(|e| e.to_string())?;
        }
        if let Some(pattern) = &cli.search {
            session
                .search(pattern, Direction::Forward, SearchScope::WholeDocument)
                .map_err(|e| e.to_string())?;
        }
        selected.push(Arc::clone(session.current_node()));
    } else {
        for node in &cli.nodes {
            selected.push(session.goto_node(node).map_err(|e| e.to_string())?);
        }
    }

    let nodes = if cli.subnodes {
        with_subnodes(&document, selected)
    } else {
        selected
    };

    let mut out = open_output(cli.output.as_ref())?;
    write_nodes(&mut out, &nodes, cli.json).map_err(|e| e.to_string())?;
    out.flush().map_err(|e| e.to_string())
}

/// The output file, or stdout for `None` and `-`.
fn open_output(path: Option<&PathBuf>) -> Result<BufWriter<Box<dyn Write>>, String> {
    let out: Box<dyn Write> = match path {
        Some(path) if path.as_os_str() != "-" => {
            Box::new(File::create(path).map_err(|e| format!("{}: {e}", path.display()))?)
        }
        _ => Box::new(io::stdout().lock()),
    };
    Ok(BufWriter::new(out))
}

/// The given nodes, each followed depth-first by its menu descendants.
fn with_subnodes(document: &Document, roots: Vec<Arc<Node>>) -> Vec<Arc<Node>> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    let mut stack: Vec<Arc<Node>> = roots.into_iter().rev().collect();

    while let Some(node) = stack.pop() {
        if !seen.insert(node.name().to_string()) {
            continue;
        }
        let children: Vec<_> = node
            .menu()
            .iter()
            .filter(|entry| !entry.target.is_external_to(Some(document.file_name())))
            .filter_map(|entry| match document.node(entry.target_node()) {
                Ok(child) => Some(child),
                Err(e) => {
                    log::warn!("skipping menu item {:?}: {e}", entry.label);
                    None
                }
            })
            .collect();
        stack.extend(children.into_iter().rev());
        ordered.push(node);
    }
    ordered
}

fn write_nodes(out: &mut impl Write, nodes: &[Arc<Node>], json: bool) -> io::Result<()> {
    if json {
        let views: Vec<NodeView<'_>> = nodes.iter().map(|n| NodeView::from(n.as_ref())).collect();
        serde_json::to_writer_pretty(&mut *out, &views)?;
        return writeln!(out);
    }

    for node in nodes {
        writeln!(out, "{}", header_line(node))?;
        write!(out, "{}", node.body())?;
        if !node.body().ends_with('\n') {
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_apropos(out: &mut impl Write, matches: &[AproposMatch], json: bool) -> io::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, matches)?;
        return writeln!(out);
    }

    for found in matches {
        let target = format!("({}){}", found.manual, found.entry.target.node);
        write!(out, "\"{target}\" -- {}", found.entry.topic)?;
        match found.entry.line {
            Some(line) => writeln!(out, " (line {line})")?,
            None => writeln!(out)?,
        }
    }
    Ok(())
}

fn header_line(node: &Node) -> String {
    let mut line = String::new();
    if let Some(file) = node.file() {
        line.push_str(&format!("File: {file},  "));
    }
    line.push_str(&format!("Node: {}", node.name()));
    for (key, target) in [("Next", node.next()), ("Prev", node.prev()), ("Up", node.up())] {
        if let Some(target) = target {
            line.push_str(&format!(",  {key}: {target}"));
        }
    }
    line
}
