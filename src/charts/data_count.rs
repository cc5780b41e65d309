use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::smallvec;

use crate::chart::{BaseChart, Chart, MandatoryAttribute, MandatoryAttributes};
use crate::charts::{LABEL_COLOR, LABEL_FONT_PX};
use crate::data::{DataSize, GroupAll};
use crate::error::ChartResult;
use crate::registry::ChartRegistry;
use crate::render::{RenderFrame, TextHAlign, TextPrimitive};

const FILTER_COUNT: &str = "%filter-count";
const TOTAL_COUNT: &str = "%total-count";

/// Text templates; `%filter-count` and `%total-count` are substituted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountTemplates {
    pub some: String,
    /// Used instead of `some` when nothing is filtered out.
    pub all: Option<String>,
}

impl Default for CountTemplates {
    fn default() -> Self {
        Self {
            some: format!("{FILTER_COUNT} selected out of {TOTAL_COUNT} records"),
            all: None,
        }
    }
}

/// "Selected out of total" widget over the whole data set.
pub struct DataCount {
    base: BaseChart,
    data_size: RefCell<Option<Rc<dyn DataSize>>>,
    group_all: RefCell<Option<Rc<dyn GroupAll>>>,
    templates: RefCell<CountTemplates>,
    text: RefCell<String>,
}

impl Default for DataCount {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCount {
    #[must_use]
    pub fn new() -> Self {
        Self::with_registry(ChartRegistry::global())
    }

    #[must_use]
    pub fn with_registry(registry: Rc<ChartRegistry>) -> Self {
        Self {
            base: BaseChart::with_registry(registry),
            data_size: RefCell::new(None),
            group_all: RefCell::new(None),
            templates: RefCell::new(CountTemplates::default()),
            text: RefCell::new(String::new()),
        }
    }

    pub fn set_data_size(&self, data_size: Rc<dyn DataSize>) {
        *self.data_size.borrow_mut() = Some(data_size);
    }

    pub fn set_group_all(&self, group_all: Rc<dyn GroupAll>) {
        *self.group_all.borrow_mut() = Some(group_all);
    }

    pub fn set_templates(&self, templates: CountTemplates) {
        *self.templates.borrow_mut() = templates;
    }

    #[must_use]
    pub fn selected(&self) -> f64 {
        self.group_all
            .borrow()
            .as_ref()
            .map_or(0.0, |group_all| group_all.value())
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.data_size
            .borrow()
            .as_ref()
            .map_or(0, |data_size| data_size.size())
    }

    /// Text produced by the last draw.
    #[must_use]
    pub fn text(&self) -> String {
        self.text.borrow().clone()
    }

    fn draw(&self) -> ChartResult<()> {
        let selected = self.selected();
        let total = self.total();
        let text = {
            let templates = self.templates.borrow();
            let template = match &templates.all {
                Some(all) if selected >= total as f64 => all,
                _ => &templates.some,
            };
            template
                .replace(FILTER_COUNT, &format_count(selected))
                .replace(TOTAL_COUNT, &format_count(total as f64))
        };
        *self.text.borrow_mut() = text.clone();

        let viewport = self.base.viewport();
        let frame = RenderFrame::new(viewport).with_text(TextPrimitive::new(
            text,
            0.0,
            LABEL_FONT_PX,
            LABEL_FONT_PX,
            LABEL_COLOR,
            TextHAlign::Left,
        ));
        self.base.present(frame)
    }
}

impl Chart for DataCount {
    fn base(&self) -> &BaseChart {
        &self.base
    }

    /// The data set stands in for the dimension and the group-all for the group.
    fn mandatory_attributes(&self) -> MandatoryAttributes {
        smallvec![
            MandatoryAttribute::new("dimension", self.data_size.borrow().is_some()),
            MandatoryAttribute::new("group", self.group_all.borrow().is_some()),
        ]
    }

    fn do_render(&self) -> ChartResult<()> {
        self.draw()
    }

    fn do_redraw(&self) -> ChartResult<()> {
        self.draw()
    }
}

/// Rounds to an integer and groups thousands with commas.
fn format_count(value: f64) -> String {
    let rounded = if value.is_finite() { value.round() as i64 } else { 0 };
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        grouped.push('-');
    }
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::format_count;

    #[test]
    fn counts_group_thousands() {
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(999.0), "999");
        assert_eq!(format_count(1234.0), "1,234");
        assert_eq!(format_count(1_234_567.4), "1,234,567");
    }
}
