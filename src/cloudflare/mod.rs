pub mod zone;

pub use zone::{CloudflareZone, DnsRecord, ZoneRecords, DEFAULT_API_BASE, TOKEN_ENV};
