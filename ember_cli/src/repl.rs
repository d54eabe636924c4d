//! The command loop.
//!
//! A thin read-eval loop over the collector: it maps user-chosen names to
//! allocation addresses, forwards each command to the core, and forgets
//! names whose addresses a collection reclaims. All replies are rendered
//! to strings so tests can assert on them.

use ember_gc::GarbageCollector;
use ember_heap::{Heap, HeapError};
use rustc_hash::FxHashMap;

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};
use std::ptr::NonNull;

/// Help text shown on startup and for `help`.
pub const HELP: &str = "\
Available commands:
  alloc <name> <size>   - Allocate an object
  ref <from> [to]       - Add external (or nested, if 'to' is given) reference
  delref <name>         - Delete external reference
  rc                    - Run reference counting GC
  ms                    - Run mark-and-sweep GC
  mem                   - Show available memory
  list                  - List tracked objects
  stats                 - Show allocation statistics
  help                  - Show this help menu
  exit                  - Quit the sandbox
";

/// A parsed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `alloc <name> <size>`
    Alloc {
        /// User-chosen object name.
        name: String,
        /// Requested payload bytes.
        size: usize,
    },
    /// `ref <name>`: add an external (root) reference.
    AddRef {
        /// Referenced object name.
        name: String,
    },
    /// `ref <from> <to>`: install a nested reference.
    NestedRef {
        /// Source object name.
        from: String,
        /// Target object name.
        to: String,
    },
    /// `delref <name>`: drop one external reference.
    DelRef {
        /// Referenced object name.
        name: String,
    },
    /// `rc`: run the reference-counting collector.
    RcCollect,
    /// `ms`: run the mark-and-sweep collector.
    MsCollect,
    /// `mem`: show available memory.
    Mem,
    /// `list`: list tracked objects.
    List,
    /// `stats`: show allocation statistics.
    Stats,
    /// `help`: show the help menu.
    Help,
    /// `exit`: leave the loop.
    Exit,
}

/// Command parsing failures. The loop reports them and continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Known command, malformed arguments.
    Usage(&'static str),
    /// Unrecognized command word.
    UnknownCommand,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Usage(usage) => write!(f, "Invalid input. Usage: {}", usage),
            ParseError::UnknownCommand => write!(f, "Unknown command. Try again."),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one input line. Blank lines parse to `None`; trailing tokens are
/// ignored.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };

    let command = match keyword {
        "alloc" => {
            let usage = ParseError::Usage("alloc <name> <size>");
            let name = words.next().ok_or(usage.clone())?.to_string();
            let size = words.next().and_then(|w| w.parse().ok()).ok_or(usage)?;
            Command::Alloc { name, size }
        }
        "ref" => {
            let from = words
                .next()
                .ok_or(ParseError::Usage("ref <from> [to]"))?
                .to_string();
            match words.next() {
                Some(to) => Command::NestedRef {
                    from,
                    to: to.to_string(),
                },
                None => Command::AddRef { name: from },
            }
        }
        "delref" => Command::DelRef {
            name: words
                .next()
                .ok_or(ParseError::Usage("delref <name>"))?
                .to_string(),
        },
        "rc" => Command::RcCollect,
        "ms" => Command::MsCollect,
        "mem" => Command::Mem,
        "list" => Command::List,
        "stats" => Command::Stats,
        "help" => Command::Help,
        "exit" => Command::Exit,
        _ => return Err(ParseError::UnknownCommand),
    };
    Ok(Some(command))
}

/// One sandbox session: a heap, a collector, and the name bindings.
pub struct Session {
    heap: Heap,
    gc: GarbageCollector,
    objects: FxHashMap<String, NonNull<u8>>,
}

impl Session {
    /// Create a session over a fresh heap.
    pub fn new() -> Result<Self, HeapError> {
        Ok(Self {
            heap: Heap::new()?,
            gc: GarbageCollector::new(),
            objects: FxHashMap::default(),
        })
    }

    /// Execute one command and return the reply text.
    ///
    /// `Exit` is the loop's concern; executing it returns the farewell
    /// line only.
    pub fn execute(&mut self, command: &Command) -> String {
        match command {
            Command::Alloc { name, size } => {
                if self.objects.contains_key(name) {
                    return "Objects must have unique names.\n".to_string();
                }
                match self.gc.alloc(&mut self.heap, *size) {
                    Some(ptr) => {
                        self.objects.insert(name.clone(), ptr);
                        format!("Allocated '{}' with {} bytes.\n", name, size)
                    }
                    None => "Allocation failed.\n".to_string(),
                }
            }

            Command::AddRef { name } => match self.objects.get(name) {
                Some(&ptr) => {
                    self.gc.add_root(ptr);
                    format!("Added external reference to '{}'.\n", name)
                }
                None => format!("Unknown object: {}\n", name),
            },

            Command::NestedRef { from, to } => {
                let (src, dest) = match (self.objects.get(from), self.objects.get(to)) {
                    (Some(&src), Some(&dest)) => (src, dest),
                    _ => return "Unknown object names.\n".to_string(),
                };
                match self.gc.add_nested(src, dest) {
                    Ok(()) => format!("Added nested reference: {} -> {}.\n", from, to),
                    Err(e) => format!("Nested reference failed: {}.\n", e),
                }
            }

            Command::DelRef { name } => match self.objects.get(name) {
                Some(&ptr) => {
                    self.gc.delete_root(ptr);
                    format!("Deleted external reference to '{}'.\n", name)
                }
                None => format!("Unknown object: {}\n", name),
            },

            Command::RcCollect => {
                let reclaimed = self.gc.rc_collect(&mut self.heap);
                self.forget(&reclaimed);
                format!(
                    "Reference counting GC completed. Reclaimed {} objects.\n",
                    reclaimed.len()
                )
            }

            Command::MsCollect => {
                let reclaimed = self.gc.ms_collect(&mut self.heap);
                self.forget(&reclaimed);
                format!(
                    "Mark-and-sweep GC completed. Reclaimed {} objects.\n",
                    reclaimed.len()
                )
            }

            Command::Mem => format!("Available memory: {} bytes.\n", self.heap.available()),

            Command::List => {
                let mut names: Vec<_> = self.objects.iter().collect();
                names.sort_by(|a, b| a.0.cmp(b.0));
                let mut out = String::from("Tracked objects:\n");
                for (name, ptr) in names {
                    let _ = writeln!(out, "  {}: {:p}", name, ptr.as_ptr());
                }
                out
            }

            Command::Stats => self.gc.stats().render(),

            Command::Help => HELP.to_string(),

            Command::Exit => "Exiting garbage collection sandbox.\n".to_string(),
        }
    }

    /// Drop the name bindings of reclaimed addresses.
    fn forget(&mut self, reclaimed: &[NonNull<u8>]) {
        self.objects.retain(|_, ptr| !reclaimed.contains(ptr));
    }

    /// Number of named objects still bound.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

/// Loop options: the REPL shows a banner and prompts, batch mode neither.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Print the banner and help preamble before the first prompt.
    pub banner: bool,
    /// Print `> ` before each read.
    pub prompt: bool,
}

/// Drive a session over line-oriented input until `exit` or end of input.
pub fn run<R, W>(
    session: &mut Session,
    input: R,
    out: &mut W,
    options: RunOptions,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    if options.banner {
        writeln!(out, "==== Interactive Garbage Collection Sandbox ====")?;
        write!(out, "{}", HELP)?;
    }

    let mut lines = input.lines();
    loop {
        if options.prompt {
            write!(out, "\n> ")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        match parse(&line?) {
            Ok(None) => continue,
            Ok(Some(Command::Exit)) => {
                write!(out, "{}", session.execute(&Command::Exit))?;
                break;
            }
            Ok(Some(command)) => write!(out, "{}", session.execute(&command))?,
            Err(e) => writeln!(out, "{}", e)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(session: &mut Session, line: &str) -> String {
        let command = parse(line).expect("parse failed").expect("blank line");
        session.execute(&command)
    }

    #[test]
    fn test_parse_alloc() {
        assert_eq!(
            parse("alloc a 100"),
            Ok(Some(Command::Alloc {
                name: "a".to_string(),
                size: 100
            }))
        );
    }

    #[test]
    fn test_parse_alloc_bad_size() {
        assert_eq!(
            parse("alloc a lots"),
            Err(ParseError::Usage("alloc <name> <size>"))
        );
    }

    #[test]
    fn test_parse_ref_one_and_two_args() {
        assert_eq!(
            parse("ref a"),
            Ok(Some(Command::AddRef {
                name: "a".to_string()
            }))
        );
        assert_eq!(
            parse("ref a b"),
            Ok(Some(Command::NestedRef {
                from: "a".to_string(),
                to: "b".to_string()
            }))
        );
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse("   "), Ok(None));
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(parse("frobnicate"), Err(ParseError::UnknownCommand));
    }

    #[test]
    fn test_alloc_and_duplicate_name() {
        let mut session = Session::new().expect("session failed");
        assert_eq!(exec(&mut session, "alloc a 100"), "Allocated 'a' with 100 bytes.\n");
        assert_eq!(exec(&mut session, "alloc a 50"), "Objects must have unique names.\n");
    }

    #[test]
    fn test_alloc_failure_message() {
        let mut session = Session::new().expect("session failed");
        assert_eq!(exec(&mut session, "alloc big 9999"), "Allocation failed.\n");
        assert_eq!(session.object_count(), 0);
    }

    #[test]
    fn test_ref_unknown_object() {
        let mut session = Session::new().expect("session failed");
        assert_eq!(exec(&mut session, "ref ghost"), "Unknown object: ghost\n");
        assert_eq!(exec(&mut session, "ref ghost other"), "Unknown object names.\n");
    }

    #[test]
    fn test_nested_too_small_message() {
        let mut session = Session::new().expect("session failed");
        exec(&mut session, "alloc tiny 4");
        exec(&mut session, "alloc big 64");
        let reply = exec(&mut session, "ref tiny big");
        assert!(reply.starts_with("Nested reference failed:"));
    }

    #[test]
    fn test_mem_reflects_allocations() {
        let mut session = Session::new().expect("session failed");
        let fresh = exec(&mut session, "mem");
        exec(&mut session, "alloc a 100");
        let used = exec(&mut session, "mem");
        assert_ne!(fresh, used);
        assert!(used.starts_with("Available memory: "));
    }

    #[test]
    fn test_collection_forgets_names() {
        let mut session = Session::new().expect("session failed");
        exec(&mut session, "alloc a 64");
        exec(&mut session, "alloc b 64");
        exec(&mut session, "delref a");
        let reply = exec(&mut session, "rc");
        assert_eq!(reply, "Reference counting GC completed. Reclaimed 1 objects.\n");
        assert_eq!(session.object_count(), 1);
        let listing = exec(&mut session, "list");
        assert!(!listing.contains("a:"));
        assert!(listing.contains("b:"));
    }

    #[test]
    fn test_cycle_demo_end_to_end() {
        let mut session = Session::new().expect("session failed");
        exec(&mut session, "alloc a 100");
        exec(&mut session, "alloc b 100");
        exec(&mut session, "ref a b");
        exec(&mut session, "ref b a");
        exec(&mut session, "delref a");
        exec(&mut session, "delref b");

        let rc = exec(&mut session, "rc");
        assert_eq!(rc, "Reference counting GC completed. Reclaimed 0 objects.\n");
        assert_eq!(session.object_count(), 2);

        let ms = exec(&mut session, "ms");
        assert_eq!(ms, "Mark-and-sweep GC completed. Reclaimed 2 objects.\n");
        assert_eq!(session.object_count(), 0);
    }

    #[test]
    fn test_run_loop_exits_cleanly() {
        let script = "alloc a 100\nmem\nbogus\nexit\nalloc never 1\n";
        let mut session = Session::new().expect("session failed");
        let mut out = Vec::new();
        run(
            &mut session,
            script.as_bytes(),
            &mut out,
            RunOptions {
                banner: false,
                prompt: false,
            },
        )
        .expect("run failed");

        let out = String::from_utf8(out).expect("utf8");
        assert!(out.contains("Allocated 'a' with 100 bytes."));
        assert!(out.contains("Available memory:"));
        assert!(out.contains("Unknown command. Try again."));
        assert!(out.contains("Exiting garbage collection sandbox."));
        // Nothing past `exit` runs.
        assert!(!out.contains("never"));
    }
}
