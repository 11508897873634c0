//! Output sinks selected by `--format`.
//!
//! Text and JSON-stream sinks print each result as it arrives. The array,
//! CSV-with-header and grouped sinks write as they go or buffer until
//! `flush`, matching what their format needs.

use crate::ui;
use clap::ValueEnum;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use tldx_lib::validate::public_suffix;
use tldx_lib::{DomainCheckError, DomainResult, ResultSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    /// Alias of json-array
    Json,
    JsonStream,
    JsonArray,
    Csv,
    /// Grouped by keyword
    Grouped,
    /// Grouped by TLD
    GroupedTld,
}

impl OutputFormat {
    /// Machine-readable formats keep stdout free of anything else.
    pub fn is_structured(self) -> bool {
        matches!(
            self,
            Self::Json | Self::JsonStream | Self::JsonArray | Self::Csv
        )
    }
}

/// Serialized shape of one result.
#[derive(Serialize)]
struct Record<'a> {
    domain: &'a str,
    available: bool,
    details: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<'a> From<&'a DomainResult> for Record<'a> {
    fn from(result: &'a DomainResult) -> Self {
        Self {
            domain: &result.domain,
            available: result.available,
            details: &result.details,
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }
}

fn io_err(e: std::io::Error) -> DomainCheckError {
    DomainCheckError::internal(format!("failed to write output: {}", e))
}

pub struct TextSink<W> {
    out: W,
    verbose: bool,
}

impl<W: Write + Send> ResultSink for TextSink<W> {
    fn write(&mut self, result: &DomainResult) -> Result<(), DomainCheckError> {
        writeln!(self.out, "{}", ui::result_line(result, self.verbose)).map_err(io_err)
    }

    fn flush(&mut self) -> Result<(), DomainCheckError> {
        self.out.flush().map_err(io_err)
    }
}

/// One JSON object per line.
pub struct JsonStreamSink<W> {
    out: W,
}

impl<W: Write + Send> ResultSink for JsonStreamSink<W> {
    fn write(&mut self, result: &DomainResult) -> Result<(), DomainCheckError> {
        let line = serde_json::to_string(&Record::from(result))?;
        writeln!(self.out, "{}", line).map_err(io_err)
    }

    fn flush(&mut self) -> Result<(), DomainCheckError> {
        self.out.flush().map_err(io_err)
    }
}

/// A pretty-printed JSON array written on flush.
pub struct JsonArraySink<W> {
    out: W,
    results: Vec<DomainResult>,
}

impl<W: Write + Send> ResultSink for JsonArraySink<W> {
    fn write(&mut self, result: &DomainResult) -> Result<(), DomainCheckError> {
        self.results.push(result.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DomainCheckError> {
        let records: Vec<Record> = self.results.iter().map(Record::from).collect();
        let json = serde_json::to_string_pretty(&records)?;
        writeln!(self.out, "{}", json).map_err(io_err)?;
        self.out.flush().map_err(io_err)
    }
}

pub struct CsvSink<W> {
    out: W,
    header_written: bool,
}

impl<W: Write + Send> CsvSink<W> {
    fn ensure_header(&mut self) -> Result<(), DomainCheckError> {
        if !self.header_written {
            writeln!(self.out, "domain,available,details,error").map_err(io_err)?;
            self.header_written = true;
        }
        Ok(())
    }
}

impl<W: Write + Send> ResultSink for CsvSink<W> {
    fn write(&mut self, result: &DomainResult) -> Result<(), DomainCheckError> {
        self.ensure_header()?;
        let error = result.error.as_ref().map(|e| e.to_string()).unwrap_or_default();
        writeln!(
            self.out,
            "{},{},{},{}",
            csv_field(&result.domain),
            result.available,
            csv_field(&result.details),
            csv_field(&error)
        )
        .map_err(io_err)
    }

    fn flush(&mut self) -> Result<(), DomainCheckError> {
        self.ensure_header()?;
        self.out.flush().map_err(io_err)
    }
}

/// Quote a field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// How grouped output picks the section for a result.
#[derive(Debug, Clone)]
pub enum GroupKey {
    /// The composed keyword a candidate was built from
    Keyword {
        keywords: HashSet<String>,
        prefixes: Vec<String>,
        suffixes: Vec<String>,
    },
    Tld,
}

impl GroupKey {
    fn key(&self, domain: &str) -> String {
        let (tld, _) = public_suffix(domain);
        match self {
            Self::Tld => format!(".{}", tld),
            Self::Keyword {
                keywords,
                prefixes,
                suffixes,
            } => {
                let base = domain
                    .strip_suffix(tld.as_str())
                    .and_then(|b| b.strip_suffix('.'))
                    .unwrap_or(domain)
                    .to_lowercase();
                keyword_of(&base, keywords, prefixes, suffixes).unwrap_or(base)
            }
        }
    }
}

/// Undo the affixes the composer may have added, accepting only a
/// remainder that is one of `keywords`. The bare label wins over any split.
fn keyword_of<'a>(
    base: &str,
    keywords: &HashSet<String>,
    prefixes: &'a [String],
    suffixes: &'a [String],
) -> Option<String> {
    let affixes = |list: &'a [String]| std::iter::once("").chain(list.iter().map(String::as_str));
    for prefix in affixes(prefixes) {
        let Some(rest) = base.strip_prefix(prefix) else {
            continue;
        };
        for suffix in affixes(suffixes) {
            match rest.strip_suffix(suffix) {
                Some(word) if keywords.contains(word) => return Some(word.to_string()),
                _ => {}
            }
        }
    }
    None
}

/// Buffers everything and prints sorted sections on flush.
pub struct GroupedSink<W> {
    out: W,
    verbose: bool,
    key: GroupKey,
    results: Vec<DomainResult>,
}

impl<W: Write + Send> ResultSink for GroupedSink<W> {
    fn write(&mut self, result: &DomainResult) -> Result<(), DomainCheckError> {
        self.results.push(result.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DomainCheckError> {
        let mut groups: BTreeMap<String, Vec<&DomainResult>> = BTreeMap::new();
        for result in &self.results {
            groups
                .entry(self.key.key(&result.domain))
                .or_default()
                .push(result);
        }

        for (label, mut members) in groups {
            members.sort_by(|a, b| a.domain.cmp(&b.domain));
            writeln!(self.out, "\n{}", ui::group_header(&label)).map_err(io_err)?;
            for result in members {
                writeln!(self.out, "{}", ui::result_line(result, self.verbose)).map_err(io_err)?;
            }
        }
        self.out.flush().map_err(io_err)
    }
}

/// Build the sink for `format` writing to `out`.
pub fn make_sink<W: Write + Send + 'static>(
    format: OutputFormat,
    out: W,
    verbose: bool,
    keywords: &[String],
    prefixes: &[String],
    suffixes: &[String],
) -> Box<dyn ResultSink> {
    match format {
        OutputFormat::Text => Box::new(TextSink { out, verbose }),
        OutputFormat::JsonStream => Box::new(JsonStreamSink { out }),
        OutputFormat::Json | OutputFormat::JsonArray => Box::new(JsonArraySink {
            out,
            results: Vec::new(),
        }),
        OutputFormat::Csv => Box::new(CsvSink {
            out,
            header_written: false,
        }),
        OutputFormat::Grouped => Box::new(GroupedSink {
            out,
            verbose,
            key: GroupKey::Keyword {
                keywords: keywords.iter().cloned().collect(),
                prefixes: prefixes.to_vec(),
                suffixes: suffixes.to_vec(),
            },
            results: Vec::new(),
        }),
        OutputFormat::GroupedTld => Box::new(GroupedSink {
            out,
            verbose,
            key: GroupKey::Tld,
            results: Vec::new(),
        }),
    }
}
