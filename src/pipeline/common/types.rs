/// What a conversion call did for one source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The output artifact was produced and placed at its final path.
    Written,
    /// The output already existed; the source was not touched.
    SkippedExisting,
}
