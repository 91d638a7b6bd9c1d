use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::matcher::{AsciiDetector, JpegDetector, JpegOutcome};
use crate::recovery::{FragmentSink, WrittenFragment};
use crate::types::{Fragment, FragmentKind, Offset, ScanConfig, ScanProgress, ScanStats};

/// Tracks scan completion in tenths of a percent
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: u64,
    last_permille: u64,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total: total as u64,
            last_permille: 0,
        }
    }

    /// Returns an update only when the displayed value changes
    #[inline]
    pub fn update(&mut self, pos: usize) -> Option<ScanProgress> {
        if self.total == 0 {
            return None;
        }
        let permille = (pos as u128 * 1000 / self.total as u128) as u64;
        if permille > self.last_permille {
            self.last_permille = permille;
            Some(ScanProgress::Permille(permille))
        } else {
            None
        }
    }
}

/// Everything a finished scan produced
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub stats: ScanStats,
    pub fragments: Vec<WrittenFragment>,
}

/// Walks a buffer one byte at a time and offers every position to each
/// enabled detector.
///
/// The cursor always advances by exactly one byte, even after a match, so
/// JPEGs embedded inside other JPEGs are found too. Only the ASCII detector
/// skips ahead, through its own suppression boundary.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
    jpeg: JpegDetector,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        let jpeg = JpegDetector::new(config.max_jpeg_len);
        Ok(Self { config, jpeg })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn scan<S>(&self, data: &[u8], sink: &mut S) -> ScanOutcome
    where
        S: FragmentSink + ?Sized,
    {
        self.scan_with_progress(data, sink, |_| {})
    }

    /// Scan the whole buffer. Per-fragment failures are logged and counted,
    /// never returned.
    pub fn scan_with_progress<S, F>(&self, data: &[u8], sink: &mut S, mut on_progress: F) -> ScanOutcome
    where
        S: FragmentSink + ?Sized,
        F: FnMut(ScanProgress),
    {
        let start_time = Instant::now();
        let scan_jpeg = self.config.is_enabled(FragmentKind::Jpeg);
        let scan_text = self.config.is_enabled(FragmentKind::Text);

        // Fresh suppression state for every scan
        let mut ascii = AsciiDetector::new(self.config.min_text_len);
        let mut progress = ProgressTracker::new(data.len());
        let mut outcome = ScanOutcome::default();

        for pos in 0..data.len() {
            if let Some(update) = progress.update(pos) {
                on_progress(update);
            }

            if scan_jpeg {
                match self.jpeg.detect(data, pos) {
                    JpegOutcome::NoHeader => {}
                    JpegOutcome::MissingFooter => {
                        outcome.stats.jpeg_headers += 1;
                        info!("JPEG: found header at byte {}", pos);
                        warn!("JPEG: footer not found for header at {}", Offset::from(pos));
                        outcome.stats.jpeg_missing_footers += 1;
                    }
                    JpegOutcome::Found(fragment) => {
                        outcome.stats.jpeg_headers += 1;
                        info!("JPEG: found header at byte {}", pos);
                        debug!("JPEG: footer found at byte {}", fragment.end() - 2);
                        Self::emit(data, &fragment, sink, &mut outcome);
                    }
                }
            }

            if scan_text {
                if let Some(fragment) = ascii.detect(data, pos) {
                    info!("ASCII: {} bytes of text found at byte {}", fragment.len(), pos);
                    Self::emit(data, &fragment, sink, &mut outcome);
                }
            }
        }

        outcome.stats.bytes_scanned = data.len() as u64;
        outcome.stats.set_duration(start_time.elapsed());
        on_progress(ScanProgress::Complete);

        outcome
    }

    fn emit<S>(data: &[u8], fragment: &Fragment, sink: &mut S, outcome: &mut ScanOutcome)
    where
        S: FragmentSink + ?Sized,
    {
        match sink.accept(data, fragment) {
            Ok(written) => {
                outcome.stats.record_written(fragment);
                outcome.fragments.push(written);
            }
            Err(e) => {
                warn!(
                    "Dropping {} fragment at {} ({}): {}",
                    fragment.kind(),
                    fragment.offset(),
                    fragment.size(),
                    e
                );
                outcome.stats.write_failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RecoveryError;

    /// Keeps fragments in memory instead of touching the filesystem
    #[derive(Default)]
    struct CollectingSink {
        accepted: Vec<(Fragment, Vec<u8>)>,
        fail_kind: Option<FragmentKind>,
    }

    impl FragmentSink for CollectingSink {
        fn accept(&mut self, data: &[u8], fragment: &Fragment) -> Result<WrittenFragment> {
            if self.fail_kind == Some(fragment.kind()) {
                return Err(RecoveryError::ArtifactWrite {
                    path: "unwritable".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
            let bytes = fragment.slice(data)?.to_vec();
            self.accepted.push((*fragment, bytes));
            let id = self.accepted.len() as u64;
            Ok(WrittenFragment {
                id,
                file_name: crate::recovery::artifact_name(fragment.kind(), id),
                path: "memory".into(),
                kind: fragment.kind(),
                start: fragment.start() as u64,
                end: fragment.end() as u64,
            })
        }
    }

    const JFIF: [u8; 12] = [
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    ];

    fn scanner() -> Scanner {
        Scanner::new(ScanConfig::default()).unwrap()
    }

    #[test]
    fn test_single_jpeg_end_to_end() {
        let mut data = JFIF.to_vec();
        data.extend((0..500).map(|i| (i % 200) as u8 | 0x80));
        data.extend_from_slice(&[0xFF, 0xD9]);

        let mut sink = CollectingSink::default();
        let outcome = scanner().scan(&data, &mut sink);

        assert_eq!(sink.accepted.len(), 1);
        let (fragment, bytes) = &sink.accepted[0];
        assert_eq!(fragment.kind(), FragmentKind::Jpeg);
        assert_eq!(fragment.len(), 514);
        assert_eq!(bytes, &data);
        assert_eq!(outcome.stats.jpeg_fragments, 1);
        assert_eq!(outcome.stats.text_fragments, 0);
        assert_eq!(outcome.stats.bytes_scanned, 514);
    }

    #[test]
    fn test_text_end_to_end() {
        let data = vec![b'A'; 2000];
        let mut sink = CollectingSink::default();
        let outcome = scanner().scan(&data, &mut sink);

        assert_eq!(sink.accepted.len(), 1);
        assert_eq!(sink.accepted[0].0.kind(), FragmentKind::Text);
        assert_eq!(sink.accepted[0].0.len(), 2000);
        assert_eq!(outcome.fragments[0].file_name, "txt-fragment-1.txt");
    }

    #[test]
    fn test_short_text_yields_nothing() {
        let data = vec![b'~'; 500];
        let mut sink = CollectingSink::default();
        let outcome = scanner().scan(&data, &mut sink);

        assert!(sink.accepted.is_empty());
        assert_eq!(outcome.stats.fragments_written(), 0);
    }

    #[test]
    fn test_nested_jpeg_found_after_outer() {
        let mut inner = JFIF.to_vec();
        inner.extend_from_slice(&[0x01; 40]);
        inner.extend_from_slice(&[0xFF, 0xD9]);

        let mut data = JFIF.to_vec();
        data.extend_from_slice(&[0x02; 10]);
        let inner_start = data.len();
        data.extend_from_slice(&inner);
        data.extend_from_slice(&[0x03; 10]);
        data.extend_from_slice(&[0xFF, 0xD9]);

        let mut sink = CollectingSink::default();
        scanner().scan(&data, &mut sink);

        // the outer JPEG ends at the inner terminator, then the inner one is found
        let ranges: Vec<(usize, usize)> = sink
            .accepted
            .iter()
            .map(|(f, _)| (f.start(), f.end()))
            .collect();
        assert_eq!(
            ranges,
            vec![(0, inner_start + inner.len()), (inner_start, inner_start + inner.len())]
        );
    }

    #[test]
    fn test_missing_footer_is_counted() {
        let mut data = JFIF.to_vec();
        data.extend_from_slice(&[0x90; 100]);

        let mut sink = CollectingSink::default();
        let outcome = scanner().scan(&data, &mut sink);

        assert!(sink.accepted.is_empty());
        assert_eq!(outcome.stats.jpeg_headers, 1);
        assert_eq!(outcome.stats.jpeg_missing_footers, 1);
    }

    #[test]
    fn test_write_failure_does_not_stop_scan() {
        let mut data = JFIF.to_vec();
        data.extend_from_slice(&[0x80; 20]);
        data.extend_from_slice(&[0xFF, 0xD9, 0x00]);
        data.extend_from_slice(&[b'q'; 1100]);

        let mut sink = CollectingSink {
            fail_kind: Some(FragmentKind::Jpeg),
            ..Default::default()
        };
        let outcome = scanner().scan(&data, &mut sink);

        assert_eq!(outcome.stats.write_failures, 1);
        assert_eq!(outcome.stats.text_fragments, 1);
        assert_eq!(sink.accepted.len(), 1);
        assert_eq!(sink.accepted[0].0.len(), 1100);
    }

    #[test]
    fn test_disabled_detector_is_skipped() {
        let mut data = vec![b'x'; 1500];
        data.extend_from_slice(&JFIF);
        data.extend_from_slice(&[0xFF, 0xD9]);

        let config = ScanConfig {
            kinds: vec![FragmentKind::Jpeg],
            ..Default::default()
        };
        let mut sink = CollectingSink::default();
        Scanner::new(config).unwrap().scan(&data, &mut sink);

        assert_eq!(sink.accepted.len(), 1);
        assert_eq!(sink.accepted[0].0.kind(), FragmentKind::Jpeg);
    }

    #[test]
    fn test_repeated_scans_are_independent() {
        let data = vec![b'A'; 1500];
        let scanner = scanner();

        let mut first = CollectingSink::default();
        let mut second = CollectingSink::default();
        scanner.scan(&data, &mut first);
        scanner.scan(&data, &mut second);

        assert_eq!(first.accepted, second.accepted);
    }

    #[test]
    fn test_progress_only_on_change() {
        let data = vec![0u8; 4000];
        let mut updates = Vec::new();
        scanner().scan_with_progress(&data, &mut CollectingSink::default(), |p| updates.push(p));

        assert_eq!(updates.last(), Some(&ScanProgress::Complete));
        let permilles: Vec<u64> = updates
            .iter()
            .filter_map(|p| match p {
                ScanProgress::Permille(v) => Some(*v),
                ScanProgress::Complete => None,
            })
            .collect();
        assert_eq!(permilles.len(), 999);
        assert!(permilles.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(permilles.last(), Some(&999));
    }

    #[test]
    fn test_empty_buffer() {
        let mut updates = Vec::new();
        let outcome =
            scanner().scan_with_progress(&[], &mut CollectingSink::default(), |p| updates.push(p));
        assert_eq!(outcome.stats.bytes_scanned, 0);
        assert_eq!(updates, vec![ScanProgress::Complete]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ScanConfig {
            kinds: Vec::new(),
            ..Default::default()
        };
        assert!(Scanner::new(config).is_err());
    }
}
