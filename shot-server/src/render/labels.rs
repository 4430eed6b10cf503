//! Receipt strings per language

use crate::core::settings::Language;

/// Every string printed on the receipt
#[derive(Debug, Clone, Copy)]
pub struct ReceiptLabels {
    pub pressure: &'static str,
    pub pressure_unit: &'static str,
    pub flow: &'static str,
    pub flow_unit: &'static str,
    pub water_flow: &'static str,
    pub coffee_flow: &'static str,
    pub temperature: &'static str,
    pub temperature_unit: &'static str,
    pub date_time: &'static str,
    pub profile: &'static str,
    pub extraction: &'static str,
    pub grinder_temp: &'static str,
    pub in_weight: &'static str,
    pub out_weight: &'static str,
    pub shot_time: &'static str,
    pub grind_setting: &'static str,
    pub initial_temp: &'static str,
    pub unknown_profile: &'static str,
    pub na: &'static str,
    pub bean_info: &'static str,
    pub tasting_note: &'static str,
    pub machine: &'static str,
}

const EN: ReceiptLabels = ReceiptLabels {
    pressure: "Pressure",
    pressure_unit: "Bar",
    flow: "Flow Rate",
    flow_unit: "g/s",
    water_flow: "Water Flow",
    coffee_flow: "Coffee Flow",
    temperature: "Temp",
    temperature_unit: "°C",
    date_time: "Date & Time",
    profile: "Profile",
    extraction: "Extraction",
    grinder_temp: "Grinder & Temp",
    in_weight: "In",
    out_weight: "Out",
    shot_time: "Time",
    grind_setting: "Grind",
    initial_temp: "Temp",
    unknown_profile: "Unknown Profile",
    na: "N/A",
    bean_info: "Bean Info",
    tasting_note: "Tasting Note",
    machine: "Machine",
};

const ZH: ReceiptLabels = ReceiptLabels {
    pressure: "压力",
    pressure_unit: "巴",
    flow: "流速",
    flow_unit: "克/秒",
    water_flow: "水流流速",
    coffee_flow: "咖啡流速",
    temperature: "温度",
    temperature_unit: "摄氏度",
    date_time: "日期时间",
    profile: "冲煮方案",
    extraction: "萃取参数",
    grinder_temp: "研磨与温度",
    in_weight: "咖啡粉",
    out_weight: "咖啡液",
    shot_time: "时间",
    grind_setting: "研磨度",
    initial_temp: "温度",
    unknown_profile: "未知方案",
    na: "未记录",
    bean_info: "咖啡豆信息",
    tasting_note: "品鉴感受",
    machine: "咖啡机",
};

impl ReceiptLabels {
    pub fn for_language(language: Language) -> &'static ReceiptLabels {
        match language {
            Language::Zh => &ZH,
            Language::En => &EN,
        }
    }

    pub fn pressure_axis(&self) -> String {
        format!("{} ({})", self.pressure, self.pressure_unit)
    }

    pub fn flow_axis(&self) -> String {
        format!("{} ({})", self.flow, self.flow_unit)
    }

    pub fn temperature_axis(&self) -> String {
        format!("{} ({})", self.temperature, self.temperature_unit)
    }
}
