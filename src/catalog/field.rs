use std::{fmt, str::FromStr};

/// Every attribute of a catalog record. The set is closed: anything the UI or the
/// CLI can name maps to exactly one storage column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Id,
    DrugName,
    ActiveIngredient,
    Concentration,
    RegistrationCode,
    Route,
    DosageForm,
    ExpiryDate,
    Manufacturer,
    ManufacturerCountry,
    Packaging,
    Unit,
    Quantity,
    UnitPrice,
    DrugGroup,
    NoticeId,
    Investor,
    SelectionMethod,
    UploadDate,
    DecisionNumber,
    DecisionDate,
    ContractorCount,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
}

impl FieldKind {
    pub fn is_numeric(self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Decimal)
    }
}

/// Fields matched by the free-text term.
pub const TEXT_SEARCH_FIELDS: [Field; 5] = [
    Field::DrugName,
    Field::ActiveIngredient,
    Field::DrugGroup,
    Field::Manufacturer,
    Field::NoticeId,
];

/// Fields offered by the condition builder.
pub const FILTERABLE_FIELDS: [Field; 11] = [
    Field::DrugName,
    Field::ActiveIngredient,
    Field::Concentration,
    Field::DosageForm,
    Field::DrugGroup,
    Field::UnitPrice,
    Field::Manufacturer,
    Field::ManufacturerCountry,
    Field::Packaging,
    Field::Investor,
    Field::NoticeId,
];

impl Field {
    pub const ALL: [Field; 23] = [
        Field::Id,
        Field::DrugName,
        Field::ActiveIngredient,
        Field::Concentration,
        Field::RegistrationCode,
        Field::Route,
        Field::DosageForm,
        Field::ExpiryDate,
        Field::Manufacturer,
        Field::ManufacturerCountry,
        Field::Packaging,
        Field::Unit,
        Field::Quantity,
        Field::UnitPrice,
        Field::DrugGroup,
        Field::NoticeId,
        Field::Investor,
        Field::SelectionMethod,
        Field::UploadDate,
        Field::DecisionNumber,
        Field::DecisionDate,
        Field::ContractorCount,
        Field::Location,
    ];

    /// Name used on the command line and in config files.
    pub fn key(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::DrugName => "drugName",
            Field::ActiveIngredient => "activeIngredient",
            Field::Concentration => "concentration",
            Field::RegistrationCode => "registrationCode",
            Field::Route => "route",
            Field::DosageForm => "dosageForm",
            Field::ExpiryDate => "expiryDate",
            Field::Manufacturer => "manufacturer",
            Field::ManufacturerCountry => "manufacturerCountry",
            Field::Packaging => "packaging",
            Field::Unit => "unit",
            Field::Quantity => "quantity",
            Field::UnitPrice => "unitPrice",
            Field::DrugGroup => "drugGroup",
            Field::NoticeId => "tbmt",
            Field::Investor => "investor",
            Field::SelectionMethod => "selectionMethod",
            Field::UploadDate => "uploadDate",
            Field::DecisionNumber => "decisionNumber",
            Field::DecisionDate => "decisionDate",
            Field::ContractorCount => "contractorCount",
            Field::Location => "location",
        }
    }

    /// Column name in the hosted table.
    pub fn column(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::DrugName => "ten_thuoc",
            Field::ActiveIngredient => "ten_hoat_chat",
            Field::Concentration => "nong_do",
            Field::RegistrationCode => "gdk_lh",
            Field::Route => "duong_dung",
            Field::DosageForm => "dang_bao_che",
            Field::ExpiryDate => "han_dung",
            Field::Manufacturer => "ten_cssx",
            Field::ManufacturerCountry => "nuoc_san_xuat",
            Field::Packaging => "quy_cach",
            Field::Unit => "don_vi_tinh",
            Field::Quantity => "so_luong",
            Field::UnitPrice => "don_gia",
            Field::DrugGroup => "nhom_thuoc",
            Field::NoticeId => "ma_tbmt",
            Field::Investor => "chu_dau_tu",
            Field::SelectionMethod => "hinh_thuc_lcnt",
            Field::UploadDate => "ngay_dang_tai",
            Field::DecisionNumber => "so_quyet_dinh",
            Field::DecisionDate => "ngay_ban_hanh",
            Field::ContractorCount => "so_nha_thau",
            Field::Location => "dia_diem",
        }
    }

    /// Column header shown to users and written into exported sheets.
    pub fn label(self) -> &'static str {
        match self {
            Field::Id => "STT",
            Field::DrugName => "Tên thuốc",
            Field::ActiveIngredient => "Tên hoạt chất",
            Field::Concentration => "Nồng độ",
            Field::RegistrationCode => "GĐKLH",
            Field::Route => "Đường dùng",
            Field::DosageForm => "Dạng bào chế",
            Field::ExpiryDate => "Hạn dùng",
            Field::Manufacturer => "Tên cơ sở sản xuất",
            Field::ManufacturerCountry => "Nước sản xuất",
            Field::Packaging => "Quy cách đóng gói",
            Field::Unit => "Đơn vị tính",
            Field::Quantity => "Số lượng",
            Field::UnitPrice => "Đơn giá",
            Field::DrugGroup => "Nhóm thuốc",
            Field::NoticeId => "TBMT",
            Field::Investor => "Chủ đầu tư",
            Field::SelectionMethod => "Hình thức lựa chọn nhà thầu",
            Field::UploadDate => "Ngày đăng tải KQLCNT",
            Field::DecisionNumber => "Số quyết định",
            Field::DecisionDate => "Ngày ban hành quyết định",
            Field::ContractorCount => "Số nhà thầu",
            Field::Location => "Địa điểm",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Id | Field::Quantity => FieldKind::Integer,
            Field::UnitPrice => FieldKind::Decimal,
            Field::ExpiryDate | Field::UploadDate | Field::DecisionDate => FieldKind::Date,
            _ => FieldKind::Text,
        }
    }

    /// Spreadsheet column width, in characters.
    pub fn export_width(self) -> f64 {
        match self {
            Field::Id => 8.0,
            Field::DrugName => 30.0,
            Field::ActiveIngredient | Field::Manufacturer | Field::Investor => 25.0,
            Field::Packaging | Field::SelectionMethod => 20.0,
            Field::UploadDate => 18.0,
            Field::RegistrationCode | Field::ExpiryDate | Field::Unit | Field::ContractorCount => {
                12.0
            }
            _ => 15.0,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    /// Accepts the field key (`unitPrice`) or the storage column (`don_gia`),
    /// ignoring ASCII case.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|field| {
                field.key().eq_ignore_ascii_case(raw) || field.column().eq_ignore_ascii_case(raw)
            })
            .ok_or_else(|| UnknownField(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_and_columns_are_unique() {
        let keys: HashSet<_> = Field::ALL.iter().map(|f| f.key()).collect();
        let columns: HashSet<_> = Field::ALL.iter().map(|f| f.column()).collect();
        assert_eq!(keys.len(), Field::ALL.len());
        assert_eq!(columns.len(), Field::ALL.len());
    }

    #[test]
    fn parses_key_and_column_case_insensitively() {
        assert_eq!("unitPrice".parse::<Field>().unwrap(), Field::UnitPrice);
        assert_eq!("UNITPRICE".parse::<Field>().unwrap(), Field::UnitPrice);
        assert_eq!("don_gia".parse::<Field>().unwrap(), Field::UnitPrice);
        assert_eq!(" tbmt ".parse::<Field>().unwrap(), Field::NoticeId);
        assert!("price".parse::<Field>().is_err());
    }

    #[test]
    fn numeric_kinds() {
        assert!(Field::UnitPrice.kind().is_numeric());
        assert!(Field::Quantity.kind().is_numeric());
        assert!(!Field::ContractorCount.kind().is_numeric());
        assert_eq!(Field::DecisionDate.kind(), FieldKind::Date);
    }
}
