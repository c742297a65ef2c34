use console::Style;

pub struct Styles {
    pub prompt: Style,
    pub status: Style,
    pub error: Style,
    pub label: Style,
    pub value: Style,
    pub deleted: Style,
}

impl Styles {
    pub fn new() -> Self {
        Self {
            prompt: Style::new().cyan().bold(),
            status: Style::new().green(),
            error: Style::new().red().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            deleted: Style::new().dim().yellow(),
        }
    }
}
