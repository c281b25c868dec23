//! Full validation pass over the files on disk.

use crate::algorithm::Algorithm;
use crate::error::BagResult;
use crate::fs::BagIo;
use crate::options::BagOptions;
use crate::manifest::Manifest;
use crate::path::RelativePath;
use crate::reader::{self, Contents};
use crate::report::Report;
use crate::size::PayloadOxum;

/// Where a bag is in its validation lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationState {
    /// Not validated since construction or the last mutation.
    #[default]
    Fresh,
    Running,
    Valid,
    Invalid,
}

impl ValidationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ValidationState::Valid | ValidationState::Invalid)
    }
}

/// Run every check in order, appending findings to `report`.
///
/// Manifests are reconciled in `registration` order; algorithms it does not
/// name follow in file-name order. The caller resets `report` first;
/// nothing here clears it.
pub(crate) fn run(
    io: &BagIo<'_>,
    options: &BagOptions,
    registration: &[Algorithm],
    report: &mut Report,
) -> BagResult<()> {
    // Structure and version gates.
    let mut contents = reader::load_contents(io, report)?;
    order_by_registration(&mut contents.payload_manifests, registration);
    order_by_registration(&mut contents.tag_manifests, registration);
    if options.warn_on_weak_algorithms {
        warn_weak_algorithms(&contents, report);
    }

    // Declared fetch destinations need not be on disk yet.
    let pending: Vec<RelativePath> = contents
        .fetch
        .entries()
        .iter()
        .map(|e| e.destination.clone())
        .collect();
    let payload = reader::payload_files(io)?;
    for manifest in &contents.payload_manifests {
        manifest.reconcile(&payload, &pending, io, report);
    }
    if !contents.tag_manifests.is_empty() {
        let tags = reader::tag_files(io)?;
        for manifest in &contents.tag_manifests {
            manifest.reconcile(&tags, &[], io, report);
        }
    }

    if let Some(info) = &contents.bag_info {
        if let Some(declared) = info.get_values("Payload-Oxum").first() {
            match PayloadOxum::parse(declared) {
                Some(declared) => {
                    let actual = reader::payload_oxum(io, &payload)?;
                    if actual != declared {
                        report.error(
                            crate::bag_info::BAG_INFO_FILE,
                            format!(
                                "Payload-Oxum {} does not match payload on disk ({})",
                                declared, actual
                            ),
                        );
                    }
                }
                None => report.error(
                    crate::bag_info::BAG_INFO_FILE,
                    format!("Payload-Oxum '{}' is malformed", declared),
                ),
            }
        }
    }

    contents
        .fetch
        .cross_check(&contents.payload_manifests, io, report);
    Ok(())
}

fn order_by_registration(manifests: &mut [Manifest], registration: &[Algorithm]) {
    manifests.sort_by_key(|m| {
        registration
            .iter()
            .position(|&alg| alg == m.algorithm())
            .unwrap_or(registration.len())
    });
}

fn warn_weak_algorithms(contents: &Contents, report: &mut Report) {
    for manifest in contents
        .payload_manifests
        .iter()
        .chain(contents.tag_manifests.iter())
    {
        if manifest.algorithm().is_weak() {
            report.warning(
                manifest.file_name(),
                format!("{} is no longer recommended", manifest.algorithm()),
            );
        }
    }
}
