//! Offline finder for backup MSBs.
//!
//! When the database is unreachable, observers fall back to MSBs fetched in
//! advance into a directory tree:
//!
//! ```text
//! <root>/<YYYY-MM-DD>/<HH-MM-SS>/band_<N>/<instrument>/<query>/<msb>.xml
//! ```
//!
//! Each `.xml` file may have a sibling `.info` file holding a short XML
//! summary (`coordstype`, `ra`, `dec`, `az`, `airmass`, `type`, `timeest`,
//! `remaining`, `msbid`).
//!
//! Time directories follow the local clock of the machine that fetched them,
//! so searches default to local time of day. A chosen MSB is put on the
//! observing queue with [`QueueTools::send_to_queue`].

use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::str::FromStr;

static DATE_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid regex"));
static TIME_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}-\d{2}-\d{2}$").expect("valid regex"));

const TRANSLATOR_HINT: &str = "source the JCMT setup scripts (/jcmt_sw/etc/cshrc or /jcmt_sw/etc/login)";
const DITSCMD_HINT: &str = "source the ITS setup scripts (/jac_sw/itsroot/etc/cshrc or /jac_sw/itsroot/etc/login)";

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Unable to read backup directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No backup times available for {0}")]
    NoTimes(String),

    #[error("Invalid {kind} '{value}'")]
    InvalidChoice { kind: &'static str, value: String },

    #[error("Unable to parse MSB summary {path}: {source}")]
    Info {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Could not find {tool}: {hint}")]
    ToolNotFound { tool: String, hint: &'static str },

    #[error("Could not launch {tool}: {source}")]
    ToolLaunch {
        tool: String,
        #[source]
        source: io::Error,
    },

    #[error("{tool} failed ({status}): {output}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        output: String,
    },
}

pub type BackupResult<T> = Result<T, BackupError>;

/// Weather band 1 (driest) to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Band(u8);

impl Band {
    pub fn new(band: u8) -> BackupResult<Self> {
        if (1..=5).contains(&band) {
            Ok(Self(band))
        } else {
            Err(BackupError::InvalidChoice {
                kind: "band",
                value: band.to_string(),
            })
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    pub fn dir_name(&self) -> String {
        format!("band_{}", self.0)
    }
}

impl FromStr for Band {
    type Err = BackupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("band_").trim_start_matches("Band ");
        digits
            .parse::<u8>()
            .map_err(|_| BackupError::InvalidChoice {
                kind: "band",
                value: s.to_string(),
            })
            .and_then(Band::new)
    }
}

macro_rules! dir_choice {
    ($name:ident, $kind:literal { $($variant:ident => $dir:literal, $label:literal $(| $alias:literal)*;)+ }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn dir_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $dir),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = BackupError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($dir)
                        || s.eq_ignore_ascii_case($label)
                        $(|| s.eq_ignore_ascii_case($alias))*
                    {
                        return Ok($name::$variant);
                    }
                )+
                Err(BackupError::InvalidChoice {
                    kind: $kind,
                    value: s.to_string(),
                })
            }
        }
    };
}

dir_choice!(Instrument, "instrument" {
    Scuba2 => "scuba-2", "SCUBA-2" | "scuba2";
    Harp => "harp", "HARP";
    RxA3 => "rxa3", "RxA3";
});

dir_choice!(QueryKind, "query" {
    Jls => "jls", "JLS";
    Pi => "pi", "PI projects";
    NothingLeft => "nl", "Nothing left";
});

/// Parameters of a backup search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupQuery {
    /// Date directory name (`YYYY-MM-DD`)
    pub date: String,
    pub band: Band,
    pub instrument: Instrument,
    pub query: QueryKind,
}

/// Summary read from an `.info` file. Fields absent from the file are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsbInfo {
    pub coords_type: String,
    pub ra: String,
    pub dec: String,
    pub az: String,
    pub airmass: String,
    pub obs_type: String,
    pub time_estimate: String,
    pub remaining: String,
    pub msbid: String,
}

impl MsbInfo {
    /// Read the summary document. Entities and CDATA sections are decoded.
    pub fn parse(content: &str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(content)?;
        let root = doc.root_element();
        let field = |name: &str| {
            root.children()
                .find(|n| n.is_element() && n.tag_name().name() == name)
                .map(|n| {
                    n.descendants()
                        .filter(|d| d.is_text())
                        .filter_map(|d| d.text())
                        .collect::<String>()
                        .trim()
                        .to_string()
                })
                .unwrap_or_default()
        };

        Ok(MsbInfo {
            coords_type: field("coordstype"),
            ra: field("ra"),
            dec: field("dec"),
            az: field("az"),
            airmass: field("airmass"),
            obs_type: field("type"),
            time_estimate: field("timeest"),
            remaining: field("remaining"),
            msbid: field("msbid"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMsb {
    pub file_name: String,
    pub path: PathBuf,
    pub info: Option<MsbInfo>,
}

impl fmt::Display for BackupMsb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.info.clone().unwrap_or_default();
        write!(
            f,
            "{:40} {:10} {:12} {:12} Az:{:10} Airmass:{:12} {:10} {:10} ID:{:10} Remaining:{:3}",
            self.file_name,
            info.coords_type,
            info.ra,
            info.dec,
            info.az,
            info.airmass,
            info.obs_type,
            info.time_estimate,
            info.msbid,
            info.remaining
        )
    }
}

/// What a search found: the directory consulted, the time chosen and the MSBs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSearch {
    pub directory: PathBuf,
    pub time: String,
    pub msbs: Vec<BackupMsb>,
}

/// Current local time of day as a time directory name.
pub fn local_time_of_day() -> String {
    chrono::Local::now().format("%H-%M-%S").to_string()
}

/// Pick the time directory to use at `now` (`HH-MM-SS`).
///
/// An exact match wins; otherwise the next later time, wrapping to the
/// earliest when `now` is after all of them. `times` need not be sorted.
pub fn select_time(times: &[String], now: &str) -> Option<String> {
    let mut sorted: Vec<&String> = times.iter().collect();
    sorted.sort();
    sorted
        .iter()
        .find(|t| t.as_str() >= now)
        .or_else(|| sorted.first())
        .map(|t| t.to_string())
}

/// A tree of fetched backup MSBs.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn list_matching(dir: &Path, pattern: &Regex) -> BackupResult<Vec<String>> {
        let entries = fs::read_dir(dir).map_err(|source| BackupError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| BackupError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            if let Some(name) = entry.file_name().to_str() {
                if pattern.is_match(name) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Date directories, oldest first.
    pub fn dates(&self) -> BackupResult<Vec<String>> {
        Self::list_matching(&self.root, &DATE_DIR)
    }

    /// Time directories under a date, earliest first. `date` must be a
    /// `YYYY-MM-DD` name.
    pub fn times(&self, date: &str) -> BackupResult<Vec<String>> {
        if !DATE_DIR.is_match(date) {
            return Err(BackupError::InvalidChoice {
                kind: "date",
                value: date.to_string(),
            });
        }
        Self::list_matching(&self.root.join(date), &TIME_DIR)
    }

    /// Backup MSBs for `query` at time of day `now` (`HH-MM-SS`).
    ///
    /// A missing band/instrument/query directory gives an empty result.
    pub fn search(&self, query: &BackupQuery, now: &str) -> BackupResult<BackupSearch> {
        if !TIME_DIR.is_match(now) {
            return Err(BackupError::InvalidChoice {
                kind: "time",
                value: now.to_string(),
            });
        }
        let times = self.times(&query.date)?;
        let time = select_time(&times, now).ok_or_else(|| BackupError::NoTimes(query.date.clone()))?;

        let directory = self
            .root
            .join(&query.date)
            .join(&time)
            .join(query.band.dir_name())
            .join(query.instrument.dir_name())
            .join(query.query.dir_name());

        let msbs = if directory.is_dir() {
            read_msbs(&directory)?
        } else {
            log::debug!("No backup directory {}", directory.display());
            Vec::new()
        };

        Ok(BackupSearch {
            directory,
            time,
            msbs,
        })
    }
}

fn read_msbs(directory: &Path) -> BackupResult<Vec<BackupMsb>> {
    let io_err = |source| BackupError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in fs::read_dir(directory).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(".xml") {
                names.push(name.to_string());
            }
        }
    }
    names.sort();

    names
        .into_iter()
        .map(|file_name| {
            let path = directory.join(&file_name);
            let info_path = path.with_extension("info");
            let info = if info_path.exists() {
                let content = fs::read_to_string(&info_path).map_err(|source| BackupError::Io {
                    path: info_path.clone(),
                    source,
                })?;
                let info = MsbInfo::parse(&content).map_err(|source| BackupError::Info {
                    path: info_path.clone(),
                    source,
                })?;
                Some(info)
            } else {
                None
            };
            Ok(BackupMsb {
                file_name,
                path,
                info,
            })
        })
        .collect()
}

/// External programs that put a backup MSB on the observing queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTools {
    /// Turns an MSB file into a queue manifest, printing the manifest path
    pub translator: PathBuf,
    pub ditscmd: PathBuf,
}

impl Default for QueueTools {
    fn default() -> Self {
        Self {
            translator: PathBuf::from("jcmttranslator"),
            ditscmd: PathBuf::from("ditscmd"),
        }
    }
}

impl QueueTools {
    /// Confirm both programs can be run.
    pub fn check(&self) -> BackupResult<()> {
        run_tool(&self.translator, ["--version"], TRANSLATOR_HINT)?;
        run_tool(&self.ditscmd, ["-h"], DITSCMD_HINT)?;
        Ok(())
    }

    /// Translate `msb` and add the resulting manifest to the back of the
    /// queue. Returns the manifest path.
    pub fn send_to_queue(&self, msb: &BackupMsb) -> BackupResult<String> {
        let output = run_tool(&self.translator, [msb.path.as_os_str()], TRANSLATOR_HINT)?;
        let manifest = output.trim().to_string();

        run_tool(
            &self.ditscmd,
            [OsStr::new("OCSQUEUE"), OsStr::new("ADDBACK"), OsStr::new(&manifest)],
            DITSCMD_HINT,
        )?;
        info!("Added {} to the queue as {}", msb.file_name, manifest);
        Ok(manifest)
    }
}

/// Run `program` to completion and return its standard output.
fn run_tool<I, S>(program: &Path, args: I, hint: &'static str) -> BackupResult<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let tool = program.display().to_string();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => BackupError::ToolNotFound {
                tool: tool.clone(),
                hint,
            },
            _ => BackupError::ToolLaunch {
                tool: tool.clone(),
                source,
            },
        })?;

    if !output.status.success() {
        let mut text = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if text.is_empty() {
            text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        }
        return Err(BackupError::ToolFailed {
            tool,
            status: output.status,
            output: text,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_select_time() {
        let available = times(&["18-00-00", "06-00-00", "12-00-00"]);
        assert_eq!(select_time(&available, "12-00-00").as_deref(), Some("12-00-00"));
        assert_eq!(select_time(&available, "07-30-00").as_deref(), Some("12-00-00"));
        assert_eq!(select_time(&available, "01-00-00").as_deref(), Some("06-00-00"));
        assert_eq!(select_time(&available, "23-00-00").as_deref(), Some("06-00-00"));
        assert_eq!(select_time(&[], "23-00-00"), None);
    }

    #[test]
    fn test_choices_parse() {
        assert_eq!("band_3".parse::<Band>().unwrap().number(), 3);
        assert_eq!("2".parse::<Band>().unwrap().dir_name(), "band_2");
        assert!("6".parse::<Band>().is_err());
        assert_eq!("SCUBA-2".parse::<Instrument>().unwrap(), Instrument::Scuba2);
        assert_eq!("rxa3".parse::<Instrument>().unwrap().dir_name(), "rxa3");
        assert_eq!("PI projects".parse::<QueryKind>().unwrap(), QueryKind::Pi);
        assert_eq!("nl".parse::<QueryKind>().unwrap(), QueryKind::NothingLeft);
        assert!("acsis".parse::<Instrument>().is_err());
    }

    #[test]
    fn test_parse_info() {
        let info = MsbInfo::parse(
            "<msbinfo>\n  <coordstype>RADEC</coordstype>\n  <ra>12:30:00</ra>\n  <dec>-10:00:00</dec>\n  \
             <az>123.4</az><airmass>1.2</airmass><type>Science</type>\n  <timeest>3600</timeest>\n  \
             <remaining>2</remaining><msbid>42</msbid>\n</msbinfo>",
        )
        .unwrap();
        assert_eq!(info.coords_type, "RADEC");
        assert_eq!(info.ra, "12:30:00");
        assert_eq!(info.dec, "-10:00:00");
        assert_eq!(info.obs_type, "Science");
        assert_eq!(info.time_estimate, "3600");
        assert_eq!(info.remaining, "2");
        assert_eq!(info.msbid, "42");
    }

    #[test]
    fn test_parse_info_decodes_entities_and_cdata() {
        let info = MsbInfo::parse(
            "<msbinfo><coordstype>RADEC</coordstype><type>Science &amp; Cal</type>\
             <ra><![CDATA[01:02:03]]></ra><msbid><![CDATA[42]]></msbid></msbinfo>",
        )
        .unwrap();
        assert_eq!(info.obs_type, "Science & Cal");
        assert_eq!(info.ra, "01:02:03");
        assert_eq!(info.msbid, "42");
        assert_eq!(info.airmass, "");
    }

    #[test]
    fn test_parse_info_rejects_malformed_xml() {
        assert!(MsbInfo::parse("<msbinfo><ra>01:00</msbinfo>").is_err());
    }

    #[test]
    fn test_times_rejects_path_outside_tree() {
        let store = BackupStore::new("/nonexistent");
        for date in ["../x", "2013-05-01/../../etc", "latest"] {
            let err = store.times(date).unwrap_err();
            assert!(matches!(err, BackupError::InvalidChoice { kind: "date", .. }), "{}", date);
        }
    }

    #[test]
    fn test_search_rejects_bad_time() {
        let store = BackupStore::new("/nonexistent");
        let query = BackupQuery {
            date: "2013-05-01".to_string(),
            band: Band::new(1).unwrap(),
            instrument: Instrument::Harp,
            query: QueryKind::Pi,
        };
        let err = store.search(&query, "12:30").unwrap_err();
        assert!(matches!(err, BackupError::InvalidChoice { kind: "time", .. }));
    }

    #[test]
    fn test_local_time_of_day_is_a_time_dir() {
        assert!(TIME_DIR.is_match(&local_time_of_day()));
    }
}
