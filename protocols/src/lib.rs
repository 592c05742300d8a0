//! Wire codecs used by the scanner's enrichment steps.

pub mod dns;
