//! Per-device-type form definitions.
//!
//! Every device type shares one save workflow; what differs between them is
//! only the data in this module: which fields exist, which are required and
//! which option lists a select field accepts.

use super::store::{Column, ColumnKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Transmitters,
    Switches,
    Valves,
    Indicators,
}

impl DeviceKind {
    pub const ALL: [DeviceKind; 4] = [
        DeviceKind::Transmitters,
        DeviceKind::Switches,
        DeviceKind::Valves,
        DeviceKind::Indicators,
    ];

    pub fn table(self) -> &'static str {
        match self {
            DeviceKind::Transmitters => "transmitters",
            DeviceKind::Switches => "switches",
            DeviceKind::Valves => "valves",
            DeviceKind::Indicators => "indicators",
        }
    }

    pub fn images_table(self) -> &'static str {
        match self {
            DeviceKind::Transmitters => "transmitters_images",
            DeviceKind::Switches => "switches_images",
            DeviceKind::Valves => "valves_images",
            DeviceKind::Indicators => "indicators_images",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            DeviceKind::Transmitters => "transmitter",
            DeviceKind::Switches => "switch",
            DeviceKind::Valves => "valve",
            DeviceKind::Indicators => "indicator",
        }
    }

    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.table() == table)
    }

    pub fn schema(self) -> &'static DeviceSchema {
        match self {
            DeviceKind::Transmitters => &TRANSMITTERS,
            DeviceKind::Switches => &SWITCHES,
            DeviceKind::Valves => &VALVES,
            DeviceKind::Indicators => &INDICATORS,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// `YYYY-MM-DD`, stored as text.
    Date,
    Select(&'static [&'static str]),
    Checkbox,
    Integer,
}

impl FieldKind {
    fn column_kind(self) -> ColumnKind {
        match self {
            FieldKind::Text | FieldKind::Date | FieldKind::Select(_) => ColumnKind::Text,
            FieldKind::Checkbox => ColumnKind::Bool,
            FieldKind::Integer => ColumnKind::Integer,
        }
    }

    fn label(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Select(_) => "select",
            FieldKind::Checkbox => "checkbox",
            FieldKind::Integer => "integer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

const fn field(name: &'static str, kind: FieldKind, required: bool) -> FieldSpec {
    FieldSpec {
        name,
        kind,
        required,
    }
}

#[derive(Debug)]
pub struct DeviceSchema {
    pub kind: DeviceKind,
    specific_fields: &'static [FieldSpec],
    pub requires_image: bool,
    pub requires_video: bool,
}

pub const STATUS_OPTIONS: &[&str] = &["working", "not-working", "faulty", "needs-calibration"];

const COMMON_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Text, true),
    field("tag", FieldKind::Text, true),
    field("location", FieldKind::Text, true),
    field("status", FieldKind::Select(STATUS_OPTIONS), true),
    field("description", FieldKind::Text, false),
    field("needs_scaffold", FieldKind::Checkbox, false),
    field("needs_isolation", FieldKind::Checkbox, false),
    field("is_spare_exist", FieldKind::Checkbox, false),
    field("how_many_spares", FieldKind::Integer, false),
    field("created_at", FieldKind::Date, true),
];

/// Columns every device row has that are not form fields.
const MEDIA_COLUMNS: &[Column] = &[
    Column::new("video", ColumnKind::Text),
    Column::new("equipment_code", ColumnKind::Text),
];

const TRANSMITTER_TYPES: &[&str] = &[
    "Pressure Transmitter",
    "Pressure Deferential Transmitter",
    "Temperature Transmitter",
    "Level Transmitter",
    "Flow Transmitter",
];

const SWITCH_TYPES: &[&str] = &[
    "Pressure Switch High",
    "Pressure Switch High High",
    "Pressure Switch Low",
    "Pressure Switch Low Low",
    "Pressure Deferential Switch High",
    "Pressure Deferential Switch High High",
    "Pressure Deferential Switch Low",
    "Pressure Deferential Switch Low Low",
    "Temperature Switch High",
    "Temperature Switch High High",
    "Temperature Switch Low",
    "Temperature Switch Low Low",
    "Temperature Deferential Switch High",
    "Temperature Deferential Switch High High",
    "Temperature Deferential Switch Low",
    "Temperature Deferential Switch Low Low",
    "Flow Switch High",
    "Flow Switch High High",
    "Flow Switch Low",
    "Flow Switch Low Low",
    "Flow Deferential Switch High",
    "Flow Deferential Switch High High",
    "Flow Deferential Switch Low",
    "Flow Deferential Switch Low Low",
    "Level Switch High",
    "Level Switch High High",
    "Level Switch Low",
    "Level Switch Low Low",
    "Level Deferential Switch High",
    "Level Deferential Switch High High",
    "Level Deferential Switch Low",
    "Level Deferential Switch Low Low",
];

const VALVE_TYPES: &[&str] = &["Shut-down", "Blow-down", "KV", "XV", "Control Valve"];

const INDICATOR_TYPES: &[&str] = &[
    "Pressure Indicator",
    "Pressure Differential Indicator",
    "Temperature Indicator",
];

static TRANSMITTERS: DeviceSchema = DeviceSchema {
    kind: DeviceKind::Transmitters,
    specific_fields: &[
        field("type", FieldKind::Select(TRANSMITTER_TYPES), true),
        field("range", FieldKind::Text, true),
        field("last_calibration", FieldKind::Date, false),
    ],
    requires_image: true,
    requires_video: true,
};

static SWITCHES: DeviceSchema = DeviceSchema {
    kind: DeviceKind::Switches,
    specific_fields: &[
        field("type", FieldKind::Select(SWITCH_TYPES), true),
        field("set_point", FieldKind::Text, true),
        field("last_calibration", FieldKind::Date, false),
    ],
    requires_image: true,
    requires_video: true,
};

static VALVES: DeviceSchema = DeviceSchema {
    kind: DeviceKind::Valves,
    specific_fields: &[
        field("type", FieldKind::Select(VALVE_TYPES), true),
        field("valve_type", FieldKind::Text, false),
        field("action_type", FieldKind::Text, true),
        field("is_control", FieldKind::Checkbox, false),
        field("size", FieldKind::Text, false),
        field("last_maintenance", FieldKind::Date, false),
    ],
    requires_image: true,
    requires_video: true,
};

static INDICATORS: DeviceSchema = DeviceSchema {
    kind: DeviceKind::Indicators,
    specific_fields: &[
        field("type", FieldKind::Select(INDICATOR_TYPES), true),
        field("range", FieldKind::Text, false),
        field("last_calibration", FieldKind::Date, false),
    ],
    requires_image: true,
    requires_video: true,
};

impl DeviceSchema {
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> + '_ {
        COMMON_FIELDS.iter().chain(self.specific_fields.iter())
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().find(|spec| spec.name == name)
    }

    /// Every stored column of the device table, in form order.
    pub fn columns(&self) -> Vec<Column> {
        self.fields()
            .map(|spec| Column::new(spec.name, spec.kind.column_kind()))
            .chain(MEDIA_COLUMNS.iter().copied())
            .collect()
    }

    pub fn describe(&self) -> DeviceSchemaDescriptor {
        DeviceSchemaDescriptor {
            kind: self.kind,
            fields: self
                .fields()
                .map(|spec| FieldDescriptor {
                    name: spec.name.to_string(),
                    kind: spec.kind.label().to_string(),
                    required: spec.required,
                    options: match spec.kind {
                        FieldKind::Select(options) => {
                            options.iter().map(ToString::to_string).collect()
                        }
                        _ => Vec::new(),
                    },
                })
                .collect(),
            requires_image: self.requires_image,
            requires_video: self.requires_video,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: String,
    pub required: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

/// Form definition served to clients so they can render a device form.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeviceSchemaDescriptor {
    pub kind: DeviceKind,
    pub fields: Vec<FieldDescriptor>,
    pub requires_image: bool,
    pub requires_video: bool,
}
