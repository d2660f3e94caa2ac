use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NullPrecedence {
    #[default]
    None,
    First,
    Last,
}

/// How a backend honors `nulls first` / `nulls last`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullOrdering {
    /// The backend accepts the `nulls first|last` clause
    #[default]
    Native,
    /// Nulls sort lowest and precedence is forced with a leading CASE key
    Emulated,
}

/// Render one `order by` element
pub fn render_order_by_element(
    ordering: NullOrdering,
    expression: &str,
    collation: Option<&str>,
    order: Option<SortOrder>,
    nulls: NullPrecedence,
) -> String {
    let mut element = expression.to_string();
    if let Some(collation) = collation {
        element.push_str(" collate ");
        element.push_str(collation);
    }
    if let Some(order) = order {
        element.push(' ');
        element.push_str(order.keyword());
    }

    match (ordering, nulls) {
        (_, NullPrecedence::None) => element,
        (NullOrdering::Native, NullPrecedence::First) => format!("{} nulls first", element),
        (NullOrdering::Native, NullPrecedence::Last) => format!("{} nulls last", element),
        (NullOrdering::Emulated, nulls) => {
            // nulls already come first ascending and last descending
            let natural = match order {
                None => true,
                Some(SortOrder::Ascending) => nulls == NullPrecedence::First,
                Some(SortOrder::Descending) => nulls == NullPrecedence::Last,
            };
            if natural {
                return element;
            }
            let key = if nulls == NullPrecedence::First {
                "0 ELSE 1"
            } else {
                "1 ELSE 0"
            };
            format!("CASE WHEN {} IS NULL THEN {} END, {}", expression, key, element)
        }
    }
}
