/// Human-readable decimal (SI) size: `999 B`, `1.0 kB`, `1.5 MB`.
pub fn format_size(bytes: u64) -> String {
    const UNIT: u64 = 1000;
    const PREFIXES: &[u8] = b"kMGTPE";

    if bytes < UNIT {
        return format!("{} B", bytes);
    }
    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }
    format!("{:.1} {}B", bytes as f64 / div as f64, PREFIXES[exp] as char)
}
