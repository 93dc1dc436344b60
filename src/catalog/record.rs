use std::{borrow::Cow, cmp::Ordering};

use serde::{Deserialize, Deserializer, Serialize};

use super::Field;

pub type RecordId = i64;

/// One row of the drug-price catalog. Field names follow the hosted table's
/// columns; missing or null values decode as empty strings and zeros.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    #[serde(default, deserialize_with = "lenient_integer")]
    pub id: RecordId,
    #[serde(rename = "ten_thuoc", default, deserialize_with = "nullable_text")]
    pub drug_name: String,
    #[serde(rename = "ten_hoat_chat", default, deserialize_with = "nullable_text")]
    pub active_ingredient: String,
    #[serde(rename = "nong_do", default, deserialize_with = "nullable_text")]
    pub concentration: String,
    #[serde(rename = "gdk_lh", default, deserialize_with = "nullable_text")]
    pub registration_code: String,
    #[serde(rename = "duong_dung", default, deserialize_with = "nullable_text")]
    pub route: String,
    #[serde(rename = "dang_bao_che", default, deserialize_with = "nullable_text")]
    pub dosage_form: String,
    #[serde(rename = "han_dung", default, deserialize_with = "nullable_text")]
    pub expiry_date: String,
    #[serde(rename = "ten_cssx", default, deserialize_with = "nullable_text")]
    pub manufacturer: String,
    #[serde(rename = "nuoc_san_xuat", default, deserialize_with = "nullable_text")]
    pub manufacturer_country: String,
    #[serde(rename = "quy_cach", default, deserialize_with = "nullable_text")]
    pub packaging: String,
    #[serde(rename = "don_vi_tinh", default, deserialize_with = "nullable_text")]
    pub unit: String,
    #[serde(rename = "so_luong", default, deserialize_with = "lenient_integer")]
    pub quantity: i64,
    #[serde(rename = "don_gia", default, deserialize_with = "lenient_decimal")]
    pub unit_price: f64,
    #[serde(rename = "nhom_thuoc", default, deserialize_with = "nullable_text")]
    pub drug_group: String,
    #[serde(rename = "ma_tbmt", default, deserialize_with = "nullable_text")]
    pub notice_id: String,
    #[serde(rename = "chu_dau_tu", default, deserialize_with = "nullable_text")]
    pub investor: String,
    #[serde(rename = "hinh_thuc_lcnt", default, deserialize_with = "nullable_text")]
    pub selection_method: String,
    #[serde(rename = "ngay_dang_tai", default, deserialize_with = "nullable_text")]
    pub upload_date: String,
    #[serde(rename = "so_quyet_dinh", default, deserialize_with = "nullable_text")]
    pub decision_number: String,
    #[serde(rename = "ngay_ban_hanh", default, deserialize_with = "nullable_text")]
    pub decision_date: String,
    #[serde(rename = "so_nha_thau", default, deserialize_with = "nullable_text")]
    pub contractor_count: String,
    #[serde(rename = "dia_diem", default, deserialize_with = "nullable_text")]
    pub location: String,
}

impl DrugRecord {
    /// Raw value of a field as text, without any locale formatting.
    pub fn text(&self, field: Field) -> Cow<'_, str> {
        match field {
            Field::Id => Cow::Owned(self.id.to_string()),
            Field::DrugName => Cow::Borrowed(&self.drug_name),
            Field::ActiveIngredient => Cow::Borrowed(&self.active_ingredient),
            Field::Concentration => Cow::Borrowed(&self.concentration),
            Field::RegistrationCode => Cow::Borrowed(&self.registration_code),
            Field::Route => Cow::Borrowed(&self.route),
            Field::DosageForm => Cow::Borrowed(&self.dosage_form),
            Field::ExpiryDate => Cow::Borrowed(&self.expiry_date),
            Field::Manufacturer => Cow::Borrowed(&self.manufacturer),
            Field::ManufacturerCountry => Cow::Borrowed(&self.manufacturer_country),
            Field::Packaging => Cow::Borrowed(&self.packaging),
            Field::Unit => Cow::Borrowed(&self.unit),
            Field::Quantity => Cow::Owned(self.quantity.to_string()),
            Field::UnitPrice => Cow::Owned(self.unit_price.to_string()),
            Field::DrugGroup => Cow::Borrowed(&self.drug_group),
            Field::NoticeId => Cow::Borrowed(&self.notice_id),
            Field::Investor => Cow::Borrowed(&self.investor),
            Field::SelectionMethod => Cow::Borrowed(&self.selection_method),
            Field::UploadDate => Cow::Borrowed(&self.upload_date),
            Field::DecisionNumber => Cow::Borrowed(&self.decision_number),
            Field::DecisionDate => Cow::Borrowed(&self.decision_date),
            Field::ContractorCount => Cow::Borrowed(&self.contractor_count),
            Field::Location => Cow::Borrowed(&self.location),
        }
    }

    /// Ordering on one field, matching how the backend sorts the column.
    pub fn compare_by(&self, other: &Self, field: Field) -> Ordering {
        match field {
            Field::Id => self.id.cmp(&other.id),
            Field::Quantity => self.quantity.cmp(&other.quantity),
            Field::UnitPrice => self.unit_price.total_cmp(&other.unit_price),
            _ => self.text(field).cmp(&other.text(field)),
        }
    }
}

fn nullable_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => text,
        Some(Raw::Number(number)) => number.to_string(),
        Some(Raw::Other(_)) | None => String::new(),
    })
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(number)) => number.as_f64().unwrap_or_default(),
        Some(serde_json::Value::String(text)) => text.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn lenient_integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|value| value as i64))
            .unwrap_or_default(),
        Some(serde_json::Value::String(text)) => text.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_row_with_nulls_and_missing_columns() {
        let row = serde_json::json!({
            "id": 42,
            "ten_thuoc": "Paracetamol 500mg",
            "ten_hoat_chat": null,
            "so_luong": "1200",
            "don_gia": 1575.5,
            "so_nha_thau": 3
        });
        let record: DrugRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.drug_name, "Paracetamol 500mg");
        assert_eq!(record.active_ingredient, "");
        assert_eq!(record.quantity, 1200);
        assert_eq!(record.unit_price, 1575.5);
        assert_eq!(record.contractor_count, "3");
        assert_eq!(record.location, "");
    }

    #[test]
    fn structured_values_in_text_columns_become_empty() {
        let row = serde_json::json!({
            "id": 7,
            "ten_thuoc": {"vi": "Paracetamol"},
            "dang_bao_che": ["Viên nén"],
            "nong_do": 500
        });
        let record: DrugRecord = serde_json::from_value(row).unwrap();
        assert_eq!(record.drug_name, "");
        assert_eq!(record.dosage_form, "");
        assert_eq!(record.concentration, "500");
    }

    #[test]
    fn compare_by_numeric_and_text_fields() {
        let cheap = DrugRecord {
            id: 2,
            drug_name: "B".to_string(),
            unit_price: 10.0,
            ..Default::default()
        };
        let pricey = DrugRecord {
            id: 1,
            drug_name: "A".to_string(),
            unit_price: 9.5e3,
            ..Default::default()
        };
        assert_eq!(cheap.compare_by(&pricey, Field::UnitPrice), Ordering::Less);
        assert_eq!(cheap.compare_by(&pricey, Field::DrugName), Ordering::Greater);
        assert_eq!(cheap.compare_by(&pricey, Field::Id), Ordering::Greater);
    }
}
