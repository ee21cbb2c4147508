//! Template processor
//!
//! Streams a template line by line. Text outside directive regions is
//! copied verbatim; each region is replaced by one expansion of its body
//! per matching call, in call order.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use tracing::{debug, info, warn};

use crate::{
    enricher::EnrichedCalls,
    templates::{directive::Directive, error::TemplateError, parser::BlockTemplate},
    wrap::{collapse_blank_lines, wrap_block, DEFAULT_LINE_WIDTH},
};

/// Syntax family of a template, selected by file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFamily {
    /// `.c.in` and `.h.in` templates
    C,
    /// `.f90.in` templates, suffix matched case-insensitively
    Fortran,
}

impl TemplateFamily {
    /// Select the family from the template file name
    pub fn from_path(path: &Path) -> Result<Self, TemplateError> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        if name.ends_with(".c.in") || name.ends_with(".h.in") {
            Ok(TemplateFamily::C)
        } else if name.to_lowercase().ends_with(".f90.in") {
            Ok(TemplateFamily::Fortran)
        } else {
            Err(TemplateError::UnsupportedSuffix {
                path: path.to_path_buf(),
            })
        }
    }

    /// Marker opening a region
    pub fn start_marker(self) -> &'static str {
        match self {
            TemplateFamily::C => "#pragma pygen start",
            TemplateFamily::Fortran => "!$PYGEN start",
        }
    }

    /// Marker closing a region
    pub fn end_marker(self) -> &'static str {
        match self {
            TemplateFamily::C => "#pragma pygen end",
            TemplateFamily::Fortran => "!$PYGEN end",
        }
    }
}

/// Counts reported after processing a template
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessSummary {
    /// Regions expanded
    pub regions: usize,
    /// Region bodies emitted, summed over all regions
    pub expansions: usize,
}

/// Region being captured
struct Region {
    directive: Directive,
    body: String,
    first_line: usize,
}

/// Expands directive regions against a set of enriched calls
pub struct TemplateProcessor<'a> {
    calls: &'a EnrichedCalls,
    line_width: usize,
}

impl<'a> TemplateProcessor<'a> {
    /// Create a processor over `calls`
    pub fn new(calls: &'a EnrichedCalls) -> Self {
        Self {
            calls,
            line_width: DEFAULT_LINE_WIDTH,
        }
    }

    /// Set the maximum line length of generated Fortran
    pub fn with_line_width(mut self, width: usize) -> Self {
        self.line_width = width;
        self
    }

    /// Process `template` into `output`, truncating any existing output.
    ///
    /// A failure part way through may leave a partially written output.
    pub fn process(&self, template: &Path, output: &Path) -> Result<ProcessSummary, TemplateError> {
        let family = TemplateFamily::from_path(template)?;

        let reader = File::open(template).map_err(|source| TemplateError::TemplateOpen {
            path: template.to_path_buf(),
            source,
        })?;
        let writer = File::create(output).map_err(|source| TemplateError::OutputCreate {
            path: output.to_path_buf(),
            source,
        })?;

        let mut writer = BufWriter::new(writer);
        let summary = self.run(family, BufReader::new(reader), &mut writer)?;
        writer.flush()?;

        info!(
            template = %template.display(),
            output = %output.display(),
            regions = summary.regions,
            expansions = summary.expansions,
            "Processed template"
        );
        Ok(summary)
    }

    /// Process template text held in memory
    pub fn process_str(
        &self,
        family: TemplateFamily,
        template: &str,
    ) -> Result<String, TemplateError> {
        let mut output = Vec::with_capacity(template.len());
        self.run(family, template.as_bytes(), &mut output)?;
        String::from_utf8(output)
            .map_err(|e| TemplateError::IoError(io::Error::new(io::ErrorKind::InvalidData, e)))
    }

    fn run<R: BufRead, W: Write>(
        &self,
        family: TemplateFamily,
        mut reader: R,
        writer: &mut W,
    ) -> Result<ProcessSummary, TemplateError> {
        let mut summary = ProcessSummary::default();
        let mut region: Option<Region> = None;
        let mut line = String::new();
        let mut line_number = 0;

        loop {
            line.clear();
            if reader.read_line(&mut line)? == 0 {
                break;
            }
            line_number += 1;

            match region.take() {
                None => match line.trim_start().strip_prefix(family.start_marker()) {
                    Some(rest) => {
                        region = Some(Region {
                            directive: Directive::parse(rest),
                            body: String::new(),
                            first_line: line_number + 1,
                        });
                    }
                    None => writer.write_all(line.as_bytes())?,
                },
                Some(mut open) => {
                    if line.trim_start().starts_with(family.end_marker()) {
                        let (text, count) = self.expand(family, &open)?;
                        writer.write_all(text.as_bytes())?;
                        summary.regions += 1;
                        summary.expansions += count;
                    } else {
                        open.body.push_str(&line);
                        region = Some(open);
                    }
                }
            }
        }

        if let Some(open) = region {
            warn!(
                line = open.first_line - 1,
                "Region has no end marker, dropping it"
            );
        }

        Ok(summary)
    }

    fn expand(
        &self,
        family: TemplateFamily,
        region: &Region,
    ) -> Result<(String, usize), TemplateError> {
        let template = BlockTemplate::parse(&region.body, region.first_line)?;
        debug!(
            line = region.first_line - 1,
            condition = ?region.directive.condition,
            exclude = ?region.directive.exclude.as_ref().map(|re| re.as_str()),
            placeholders = ?template.placeholders(),
            "Expanding region"
        );
        let unknown = template.unknown_placeholders();
        if !unknown.is_empty() {
            warn!(
                line = region.first_line - 1,
                placeholders = ?unknown,
                "Region uses placeholders that name no attribute"
            );
        }

        let mut output = String::new();
        let mut count = 0;
        for call in self.calls.enabled() {
            if !region.directive.includes(call)? {
                continue;
            }

            let rendered = template.render(call)?;
            let rendered = match family {
                TemplateFamily::Fortran => wrap_block(&rendered, self.line_width),
                TemplateFamily::C => collapse_blank_lines(&rendered),
            };
            output.push_str(&rendered);
            count += 1;
        }

        Ok((output, count))
    }
}

/// Process `template_path` into `output_path` for `calls`.
pub fn process(
    template_path: &Path,
    output_path: &Path,
    calls: &EnrichedCalls,
) -> Result<ProcessSummary, TemplateError> {
    TemplateProcessor::new(calls).process(template_path, output_path)
}
