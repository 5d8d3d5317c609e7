//! Content-addressed matching and header transplanting.
//!
//! The observed record's current header is deliberately ignored when
//! matching: identity comes from the whole-image hash (which excludes the
//! descriptor and any trainer) or, failing that, from the PRG + CHR
//! segment hash pair. Algorithms are tried strongest-first and the first
//! hit wins, so a SHA-256 identity always preempts a CRC-32 collision.

use std::collections::HashMap;

use romclerk_core::record::{RomHeader, RomRecord};
use romclerk_core::{RomError, SegmentDigests};

/// One library: typed hash key to template record. A record imported from
/// a document may be registered under several keys.
pub type TemplateLibrary = HashMap<String, RomRecord>;

/// Which hash algorithms the cascade may use. Order is fixed; these
/// switches only enable or disable steps.
#[derive(Debug, Clone, Copy)]
pub struct MatchAlgorithms {
    pub sha256: bool,
    pub sha1: bool,
    pub md5: bool,
    pub crc32: bool,
    pub sum16: bool,
}

impl Default for MatchAlgorithms {
    fn default() -> Self {
        Self {
            sha256: true,
            sha1: true,
            md5: true,
            crc32: true,
            sum16: true,
        }
    }
}

/// How a transplant treats the observed record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransplantOptions {
    /// Permit iNES templates (and cross-variant segment matching)
    pub enable_ines: bool,
    /// Concatenate PRG + CHR and discard misc residue after transplant
    pub truncate: bool,
    /// Always overwrite name/relative-path; otherwise only fill blanks
    pub organize: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Algorithm {
    Sha256,
    Sha1,
    Md5,
    Crc32,
    Sum16,
}

impl Algorithm {
    /// The typed lookup key for an observed record, `None` for sum-16
    /// which has no whole-image form.
    fn whole_key(self, record: &RomRecord) -> Option<String> {
        match self {
            Algorithm::Sha256 => Some(format!("SHA256:{}", record.digests.sha256_hex())),
            Algorithm::Sha1 => Some(format!("SHA1:{}", record.digests.sha1_hex())),
            Algorithm::Md5 => Some(format!("MD5:{}", record.digests.md5_hex())),
            Algorithm::Crc32 => Some(format!("CRC32:{}", record.digests.crc32_hex())),
            Algorithm::Sum16 => None,
        }
    }

    fn segments_equal(self, left: &SegmentDigests, right: &SegmentDigests) -> bool {
        match self {
            Algorithm::Sha256 => left.sha256 == right.sha256,
            Algorithm::Sha1 => left.sha1 == right.sha1,
            Algorithm::Md5 => left.md5 == right.md5,
            Algorithm::Crc32 => left.crc32 == right.crc32,
            Algorithm::Sum16 => left.sum16 == right.sum16,
        }
    }
}

/// Identify an observed NES record against the library.
///
/// For each enabled algorithm, strongest first: try the whole-image key,
/// then scan for a template whose PRG and CHR hashes both equal the
/// observed ones. An empty CHR on both sides is a trivial CHR match.
/// Returns `NoMatch` when every enabled algorithm misses.
pub fn match_nes_rom<'library>(
    observed: &RomRecord,
    library: &'library TemplateLibrary,
    algorithms: &MatchAlgorithms,
    enable_ines: bool,
) -> Result<&'library RomRecord, RomError> {
    let cascade = [
        (algorithms.sha256, Algorithm::Sha256),
        (algorithms.sha1, Algorithm::Sha1),
        (algorithms.md5, Algorithm::Md5),
        (algorithms.crc32, Algorithm::Crc32),
        (algorithms.sum16, Algorithm::Sum16),
    ];

    for (enabled, algorithm) in cascade {
        if !enabled {
            continue;
        }

        if let Some(key) = algorithm.whole_key(observed) {
            if let Some(template) = library.get(&key) {
                return Ok(template);
            }
        }

        for template in library.values() {
            if segment_pair_matches(template, observed, algorithm, enable_ines) {
                return Ok(template);
            }
        }
    }

    Err(no_match_error(observed))
}

/// Identify an FDS archive. Disk filesystems have no stable segment
/// decomposition, so only the whole-archive key cascade applies.
pub fn match_fds_archive<'library>(
    observed: &RomRecord,
    library: &'library TemplateLibrary,
    algorithms: &MatchAlgorithms,
) -> Result<&'library RomRecord, RomError> {
    let cascade = [
        (algorithms.sha256, Algorithm::Sha256),
        (algorithms.sha1, Algorithm::Sha1),
        (algorithms.md5, Algorithm::Md5),
        (algorithms.crc32, Algorithm::Crc32),
    ];

    for (enabled, algorithm) in cascade {
        if !enabled {
            continue;
        }

        if let Some(key) = algorithm.whole_key(observed) {
            if let Some(template) = library.get(&key) {
                return Ok(template);
            }
        }
    }

    Err(no_match_error(observed))
}

/// Copy the template's header and organizational metadata onto the
/// observed record. The observed payload, segments, and per-segment
/// digests are untouched; only the header variant, the whole-image hash
/// quartet, and (per `organize`) name and relative path change.
pub fn transplant(
    observed: &mut RomRecord,
    template: &RomRecord,
    options: &TransplantOptions,
) -> Result<(), RomError> {
    match &template.header {
        RomHeader::Nes20(header) => {
            observed.header = RomHeader::Nes20(header.clone());
        }
        RomHeader::Ines(header) if options.enable_ines => {
            observed.header = RomHeader::Ines(header.clone());
        }
        RomHeader::Fds(_) => {
            // FDS transplants keep the observed filesystem; only the
            // organizational metadata comes across.
        }
        _ => return Err(RomError::other("unable to update ROM from template")),
    }

    if options.organize || observed.name.is_empty() {
        observed.name = template.name.clone();
    }
    if options.organize || observed.relative_path.is_empty() {
        observed.relative_path = template.relative_path.clone();
    }

    if !matches!(template.header, RomHeader::Fds(_)) {
        observed.digests = template.digests;
    }

    if options.truncate {
        observed.truncate_to_declared();
    }

    Ok(())
}

/// Compare the PRG and CHR digest pair of a template and an observed
/// record under one algorithm. Cross-variant pairs only participate when
/// iNES matching is enabled; FDS records never match by segments.
fn segment_pair_matches(
    template: &RomRecord,
    observed: &RomRecord,
    algorithm: Algorithm,
    enable_ines: bool,
) -> bool {
    let variant_ok = match (&template.header, &observed.header) {
        (RomHeader::Nes20(_), RomHeader::Nes20(_)) => true,
        (RomHeader::Nes20(_), RomHeader::Ines(_))
        | (RomHeader::Ines(_), RomHeader::Nes20(_))
        | (RomHeader::Ines(_), RomHeader::Ines(_)) => enable_ines,
        _ => false,
    };
    if !variant_ok {
        return false;
    }

    let prg_matches = algorithm.segments_equal(&template.prg_digests, &observed.prg_digests);

    let chr_matches = if template.header.chr_rom_bytes() == 0
        && observed.header.chr_rom_bytes() == 0
    {
        true
    } else {
        algorithm.segments_equal(&template.chr_digests, &observed.chr_digests)
    };

    prg_matches && chr_matches
}

fn no_match_error(observed: &RomRecord) -> RomError {
    RomError::NoMatch {
        name: if observed.name.is_empty() {
            observed.relative_path.clone()
        } else {
            observed.name.clone()
        },
        crc32: observed.digests.crc32_hex(),
        sha1: observed.digests.sha1_hex(),
        sha256: observed.digests.sha256_hex(),
    }
}

#[cfg(test)]
#[path = "tests/matcher_tests.rs"]
mod tests;
