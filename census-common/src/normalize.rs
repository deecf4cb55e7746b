use once_cell::sync::Lazy;
use regex::Regex;

/// Clients report manufacturer-prefixed device names with jacked up casing
/// and vendor aliases. Anchored case-insensitive rewrites, applied in order;
/// later rules see the output of earlier ones.
static PREFIX_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("asus", "ASUS"),
        ("acer", "Acer"),
        ("lge", "LG"),
        ("huawei", "Huawei"),
        ("samsung", "Samsung"),
        ("motorola", "Motorola"),
        ("oppo", "OPPO"),
        ("sharp", "Sharp"),
        ("toshiba", "Toshiba"),
        ("fujitsu", "Fujitsu"),
        ("lenovo", "Lenovo"),
        ("kyocera", "Kyocera"),
        ("fuhu", "Fuhu"),
        ("meizu", "Meizu"),
        ("tct( alcatel)?", "Alcatel"),
        ("coolpad", "YuLong Coolpad"),
        ("nubia nx40x", "ZTE Nubia NX40X"),
        ("unknown 8150", "YuLong Coolpad 8150"),
        ("unknown lenovo", "Lenovo"),
    ]
    .into_iter()
    .map(|(prefix, canonical)| {
        let pattern = Regex::new(&format!("(?i)^{prefix}")).expect("prefix rules must compile");
        (pattern, canonical)
    })
    .collect()
});

/// Rewrite a free-text device name into its canonical vendor form.
/// Idempotent: normalizing an already-normalized name is a no-op.
pub fn normalize(raw_name: &str) -> String {
    let mut name = raw_name.to_owned();

    for (pattern, canonical) in PREFIX_RULES.iter() {
        if let std::borrow::Cow::Owned(rewritten) = pattern.replace(&name, *canonical) {
            name = rewritten;
        }
    }

    name.replace("_one_touch_", " ONE TOUCH ")
}
