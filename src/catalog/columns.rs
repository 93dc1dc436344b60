use std::{fmt, str::FromStr};

use super::Field;

/// Columns that stay visible whatever the user hides.
pub const ALWAYS_VISIBLE: [Field; 2] = [Field::Id, Field::DrugName];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPreset {
    Essential,
    Pricing,
    Detailed,
    Procurement,
    All,
}

impl ColumnPreset {
    pub const ALL: [ColumnPreset; 5] = [
        ColumnPreset::Essential,
        ColumnPreset::Pricing,
        ColumnPreset::Detailed,
        ColumnPreset::Procurement,
        ColumnPreset::All,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ColumnPreset::Essential => "essential",
            ColumnPreset::Pricing => "pricing",
            ColumnPreset::Detailed => "detailed",
            ColumnPreset::Procurement => "procurement",
            ColumnPreset::All => "all",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ColumnPreset::Essential => "Thông tin cơ bản",
            ColumnPreset::Pricing => "Thông tin giá",
            ColumnPreset::Detailed => "Chi tiết thuốc",
            ColumnPreset::Procurement => "Thông tin đấu thầu",
            ColumnPreset::All => "Tất cả cột",
        }
    }

    fn fields(self) -> &'static [Field] {
        match self {
            ColumnPreset::Essential => &[
                Field::DrugName,
                Field::ActiveIngredient,
                Field::Concentration,
                Field::DosageForm,
                Field::Manufacturer,
                Field::UnitPrice,
            ],
            ColumnPreset::Pricing => &[
                Field::DrugName,
                Field::ActiveIngredient,
                Field::Manufacturer,
                Field::Quantity,
                Field::UnitPrice,
                Field::Unit,
                Field::Packaging,
            ],
            ColumnPreset::Detailed => &[
                Field::DrugName,
                Field::ActiveIngredient,
                Field::Concentration,
                Field::DosageForm,
                Field::Route,
                Field::ExpiryDate,
                Field::Manufacturer,
                Field::ManufacturerCountry,
            ],
            ColumnPreset::Procurement => &[
                Field::DrugName,
                Field::Investor,
                Field::SelectionMethod,
                Field::DecisionNumber,
                Field::DecisionDate,
                Field::Location,
                Field::NoticeId,
            ],
            ColumnPreset::All => &Field::ALL,
        }
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|p| *p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for ColumnPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnPreset {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.name().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| {
                let names: Vec<_> = Self::ALL.iter().map(|p| p.name()).collect();
                format!("unknown column preset '{raw}' (expected one of {})", names.join(", "))
            })
    }
}

/// The set of visible table columns, always rendered in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSet {
    visible: Vec<Field>,
}

impl Default for ColumnSet {
    fn default() -> Self {
        Self::from_preset(ColumnPreset::Essential)
    }
}

impl ColumnSet {
    pub fn from_preset(preset: ColumnPreset) -> Self {
        let mut set = Self {
            visible: Vec::new(),
        };
        for field in ALWAYS_VISIBLE.iter().chain(preset.fields()) {
            set.insert(*field);
        }
        set
    }

    pub fn fields(&self) -> &[Field] {
        &self.visible
    }

    pub fn is_visible(&self, field: Field) -> bool {
        self.visible.contains(&field)
    }

    /// Show or hide a column. Returns false when the column cannot be hidden.
    pub fn toggle(&mut self, field: Field) -> bool {
        if ALWAYS_VISIBLE.contains(&field) {
            return false;
        }
        if self.is_visible(field) {
            self.visible.retain(|f| *f != field);
        } else {
            self.insert(field);
        }
        true
    }

    fn insert(&mut self, field: Field) {
        if !self.visible.contains(&field) {
            self.visible.push(field);
            self.visible.sort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_always_include_id_and_name_first() {
        for preset in ColumnPreset::ALL {
            let set = ColumnSet::from_preset(preset);
            assert_eq!(&set.fields()[..2], &ALWAYS_VISIBLE);
        }
        assert_eq!(ColumnSet::from_preset(ColumnPreset::All).fields().len(), Field::ALL.len());
    }

    #[test]
    fn always_visible_columns_cannot_be_hidden() {
        let mut set = ColumnSet::default();
        assert!(!set.toggle(Field::DrugName));
        assert!(set.is_visible(Field::DrugName));
        assert!(set.toggle(Field::UnitPrice));
        assert!(!set.is_visible(Field::UnitPrice));
        assert!(set.toggle(Field::Location));
        assert_eq!(set.fields().last(), Some(&Field::Location));
    }

    #[test]
    fn preset_cycle_wraps() {
        assert_eq!(ColumnPreset::All.next(), ColumnPreset::Essential);
        assert_eq!("Pricing".parse::<ColumnPreset>().unwrap(), ColumnPreset::Pricing);
    }
}
