// TableWalker backed by the net-snmp command line tools (snmpbulkwalk).
// One bulk walk per column; rows are joined on the explicit row index.

use std::collections::BTreeMap;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use super::{TableRow, TableWalker, WalkItem};
use crate::config::DeviceConfig;
use crate::error::WalkFault;
use crate::models::PortId;

const DEFAULT_PROGRAM: &str = "snmpbulkwalk";
const DEFAULT_MIB: &str = "IF-MIB";
const EXIT_POLL: Duration = Duration::from_millis(10);

pub struct NetSnmpWalker {
    program: String,
    leading_args: Vec<String>,
    target: String,
    community: String,
    max_repetitions: u32,
    request_timeout: Duration,
    retries: u32,
    walk_timeout: Option<Duration>,
    mib: String,
}

/// Rows of one column, plus the fault that cut the column short, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnWalk {
    pub rows: Vec<(PortId, String)>,
    pub fault: Option<WalkFault>,
}

impl NetSnmpWalker {
    pub fn new(device: &DeviceConfig) -> Self {
        Self {
            program: DEFAULT_PROGRAM.into(),
            leading_args: Vec::new(),
            target: format!("udp:{}:{}", device.address, device.port),
            community: device.community.clone(),
            max_repetitions: device.max_repetitions,
            request_timeout: Duration::from_millis(device.request_timeout_ms),
            retries: device.retries,
            walk_timeout: device.fetch_timeout(),
            mib: DEFAULT_MIB.into(),
        }
    }

    /// Replaces the walk executable. `leading_args` go before the walk options.
    pub fn with_command<I, S>(mut self, program: impl Into<String>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = program.into();
        self.leading_args = leading_args.into_iter().map(Into::into).collect();
        self
    }

    /// Bound on one whole `walk` (all columns). `None` waits for the tool.
    pub fn with_walk_timeout(mut self, limit: Option<Duration>) -> Self {
        self.walk_timeout = limit;
        self
    }

    fn object(&self, column: &str) -> String {
        if column.contains("::") || column.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            column.to_string()
        } else {
            format!("{}::{}", self.mib, column)
        }
    }

    fn command(&self, column: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("-v2c")
            .args(["-c", self.community.as_str()])
            .arg(format!("-Cr{}", self.max_repetitions))
            .arg(format!("-t{}", self.request_timeout.as_secs_f64()))
            .arg(format!("-r{}", self.retries))
            .args(["-Oqs", "-Ln"])
            .arg(&self.target)
            .arg(self.object(column))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }

    /// Runs the tool for one column. Whatever it printed before failing or
    /// being killed at `deadline` is still parsed.
    fn walk_column(&self, column: &str, deadline: Option<Instant>) -> ColumnWalk {
        let mut child = match self.command(column).spawn() {
            Ok(child) => child,
            Err(e) => {
                return ColumnWalk {
                    rows: Vec::new(),
                    fault: Some(WalkFault::Indication(format!("{}: {}", self.program, e))),
                };
            }
        };
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let exit = wait_until(&mut child, deadline);
        let stdout = collect(stdout);
        let stderr = collect(stderr);

        let mut walked = parse_walk_output(&stdout);
        if walked.fault.is_some() {
            return walked;
        }
        walked.fault = match exit {
            Exit::Finished(status) if status.success() => None,
            Exit::Finished(status) => Some(WalkFault::Indication(format!(
                "{} exited with {}: {}",
                self.program,
                status,
                stderr.trim()
            ))),
            Exit::Killed => Some(WalkFault::Indication(format!(
                "{} did not finish in time; killed after {} rows",
                self.program,
                walked.rows.len()
            ))),
            Exit::Failed(e) => Some(WalkFault::Indication(format!(
                "{}: waiting for exit: {}",
                self.program, e
            ))),
        };
        walked
    }
}

enum Exit {
    Finished(ExitStatus),
    Killed,
    Failed(std::io::Error),
}

/// Polls for exit; past `deadline` the child is killed and reaped.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> Exit {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Exit::Finished(status),
            Ok(None) => {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Exit::Killed;
                }
                std::thread::sleep(EXIT_POLL);
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Exit::Failed(e);
            }
        }
    }
}

/// Reads a pipe to the end on its own thread so a full pipe never stalls the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> String {
    reader
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

impl TableWalker for NetSnmpWalker {
    fn walk<'a>(&'a self, columns: &[String]) -> Box<dyn Iterator<Item = WalkItem> + Send + 'a> {
        let deadline = self.walk_timeout.map(|limit| Instant::now() + limit);
        let per_column = columns
            .iter()
            .enumerate()
            .map(|(pos, column)| {
                let mut walked = self.walk_column(column, deadline);
                if let Some(WalkFault::Status { index, .. }) = walked.fault.as_mut() {
                    *index = pos + 1;
                }
                (walked.rows.into_iter().collect(), walked.fault)
            })
            .collect();
        Box::new(join_columns(per_column).into_iter())
    }
}

/// Parses `snmpbulkwalk -Oqs` output (`<column>.<index> <value>` per line).
///
/// Lines whose object has no numeric trailing index are skipped. A
/// `No Such Object`/`No Such Instance` marker ends the column with a
/// device-level fault; rows before it are kept.
pub fn parse_walk_output(text: &str) -> ColumnWalk {
    let mut walked = ColumnWalk::default();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let status = if line.contains("No Such Object") {
            Some("noSuchObject")
        } else if line.contains("No Such Instance") {
            Some("noSuchInstance")
        } else {
            None
        };
        if let Some(status) = status {
            walked.fault = Some(WalkFault::Status {
                status: status.into(),
                index: 0,
            });
            break;
        }
        if line.contains("No more variables left") {
            break;
        }
        let (object, value) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let Some(index) = object
            .rsplit_once('.')
            .and_then(|(_, idx)| idx.parse::<PortId>().ok())
        else {
            tracing::debug!(line, "skipping walk line without row index");
            continue;
        };
        let value = value.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|v| v.strip_suffix('"'))
            .unwrap_or(value);
        walked.rows.push((index, value.to_string()));
    }
    walked
}

/// Joins per-column results into rows in ascending index order of the first
/// column. A row missing from a later column ends the walk with that
/// column's fault (or `noSuchInstance`); a column cut short after its last
/// complete row ends the walk with its fault after those rows.
fn join_columns(per_column: Vec<(BTreeMap<PortId, String>, Option<WalkFault>)>) -> Vec<WalkItem> {
    let Some((first, _)) = per_column.first() else {
        return Vec::new();
    };
    let mut rows = Vec::with_capacity(first.len() + 1);
    for &index in first.keys() {
        let mut values = Vec::with_capacity(per_column.len());
        for (pos, (column, fault)) in per_column.iter().enumerate() {
            match column.get(&index) {
                Some(v) => values.push(v.clone()),
                None => {
                    rows.push(Err(fault.clone().unwrap_or_else(|| WalkFault::Status {
                        status: "noSuchInstance".into(),
                        index: pos + 1,
                    })));
                    return rows;
                }
            }
        }
        rows.push(Ok(TableRow::keyed(index, values)));
    }
    if let Some(fault) = per_column.iter().find_map(|(_, fault)| fault.clone()) {
        rows.push(Err(fault));
    }
    rows
}
