/// 欄位與類別名稱的固定顯示翻譯
const TRANSLATIONS: [(&str, &str); 6] = [
    ("id", "TID"),
    ("ref", "REF"),
    ("kote", "Kote"),
    ("bezeichnung", "Bezeichnung"),
    ("letzte_aenderung", "Letzte Änderung"),
    ("model", "Modell"),
];

/// 查表；未知鍵改為首字大寫並以空白取代底線
pub fn translate_header(key: &str) -> String {
    if let Some((_, label)) = TRANSLATIONS.iter().find(|(k, _)| *k == key) {
        return (*label).to_string();
    }

    let mut chars = key.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.collect();
            format!("{}{}", first.to_uppercase(), rest.replace('_', " "))
        }
        None => String::new(),
    }
}
