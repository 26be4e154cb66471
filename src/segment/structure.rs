use super::*;

#[derive(Debug, Clone)]
pub struct StructureConfig {
    pub max_sample_chars: usize,
    pub max_attempts: u32,
    pub retry: RetryPolicy,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            max_sample_chars: 40_000,
            max_attempts: 2,
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StructureOutcome {
    pub candidate: StructureCandidate,
    pub report: ValidationReport,
    pub attempts: u32,
    pub structural_line_count: usize,
}

/// Runs skeleton extraction, the structure oracle, repair and validation.
/// An invalid hierarchy is returned with its report, never rejected here.
pub struct StructureDetector<'a> {
    oracle: &'a dyn StructureOracle,
    clock: &'a dyn Clock,
    progress: &'a dyn ProgressSink,
    config: StructureConfig,
    lines: StructuralLineExtractor,
    validator: StructureValidator,
    repairer: JsonRepairer,
}

impl<'a> StructureDetector<'a> {
    pub fn new(
        oracle: &'a dyn StructureOracle,
        clock: &'a dyn Clock,
        progress: &'a dyn ProgressSink,
        config: StructureConfig,
    ) -> Result<Self> {
        Ok(Self {
            oracle,
            clock,
            progress,
            config,
            lines: StructuralLineExtractor::new()?,
            validator: StructureValidator::new()?,
            repairer: JsonRepairer::with_record_markers(["subtopics"]),
        })
    }

    pub fn detect(
        &self,
        document_text: &str,
        subject_name: &str,
        cancel: &CancellationToken,
    ) -> Result<StructureOutcome, StructureError> {
        if document_text.trim().is_empty() {
            return Err(StructureError::EmptyDocument);
        }

        let structural_lines = self.lines.extract(document_text);
        let sample = if structural_lines.is_empty() {
            truncate_chars(document_text, self.config.max_sample_chars).to_string()
        } else {
            render_skeleton(&structural_lines, self.config.max_sample_chars)
        };
        info!(
            structural_lines = structural_lines.len(),
            sample_chars = sample.chars().count(),
            "prepared structure sample"
        );

        let max_attempts = self.config.max_attempts.max(1);
        let mut best: Option<(StructureCandidate, ValidationReport)> = None;
        let mut last_json_error = None;
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            let raw = with_retry(
                &self.config.retry,
                self.clock,
                cancel,
                self.progress,
                "structure detection",
                |_| self.oracle.detect_structure(&sample, subject_name),
            )?;

            let candidate = match self.repairer.parse::<StructureCandidate>(&raw) {
                Ok(candidate) => candidate,
                Err(err) => {
                    warn!(attempt = attempts, error = %err, "structure response unusable");
                    self.progress.report(
                        ProgressLevel::Warning,
                        &format!("structure attempt {attempts}: {err}"),
                    );
                    last_json_error = Some(err);
                    continue;
                }
            };

            let report = self.validator.validate(&candidate);
            info!(
                attempt = attempts,
                topics = candidate.topics().len(),
                issues = report.issues.len(),
                "structure candidate validated"
            );

            let improves = best
                .as_ref()
                .is_none_or(|(_, current)| report.issues.len() < current.issues.len());
            let is_valid = report.is_valid;
            if improves {
                best = Some((candidate, report));
            }
            if is_valid || cancel.is_cancelled() {
                break;
            }
        }

        match (best, last_json_error) {
            (Some((candidate, report)), _) => Ok(StructureOutcome {
                candidate,
                report,
                attempts,
                structural_line_count: structural_lines.len(),
            }),
            (None, Some(err)) => Err(StructureError::Json(err)),
            (None, None) => Err(StructureError::Oracle(RetryError::Cancelled { attempts })),
        }
    }
}

pub(super) fn render_skeleton(lines: &[StructuralLine], max_chars: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;

    for line in lines {
        let rendered = format!("L{}: {}\n", line.line_index, line.text);
        let rendered_chars = rendered.chars().count();
        if used + rendered_chars > max_chars {
            break;
        }
        used += rendered_chars;
        out.push_str(&rendered);
    }

    out
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
