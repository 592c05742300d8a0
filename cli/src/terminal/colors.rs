use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightCyan;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const IPV4_ADDR: Color = Color::BrightBlue;
pub const IPV6_ADDR: Color = Color::Blue;
pub const PORTS: Color = Color::BrightYellow;

pub const RISK_LOW: Color = Color::Green;
pub const RISK_MEDIUM: Color = Color::Yellow;
pub const RISK_HIGH: Color = Color::BrightRed;
pub const RISK_CRITICAL: Color = Color::Red;
