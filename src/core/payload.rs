use crate::domain::model::{FormDocument, FormPayload, YEAR_FIELD};

/// 序列化表單；非自訂學年時以下拉選單的值覆寫 `year`
pub fn build_payload(document: &FormDocument) -> FormPayload {
    let mut payload = FormPayload::from_entries(document.entries());

    if !document.year_select.is_custom() {
        payload.set(YEAR_FIELD, &document.year_select.value);
    }

    payload
}
