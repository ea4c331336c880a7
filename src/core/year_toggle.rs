use crate::domain::model::FormDocument;

/// 依下拉選單切換自訂學年欄位的顯示、必填與內容
pub fn toggle_year_input(document: &mut FormDocument) {
    let select_value = document.year_select.value.clone();
    let year_override = &mut document.year_override;

    if document.year_select.is_custom() {
        year_override.visible = true;
        year_override.required = true;
        year_override.value.clear();
    } else {
        year_override.visible = false;
        year_override.required = false;
        year_override.value = select_value;
    }
}

/// Uppercases keystroke input, keeping one output char per input char.
pub fn normalize_override_input(text: &str) -> String {
    text.chars()
        .map(|c| {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(single), None) => single,
                _ => c,
            }
        })
        .collect()
}
