//! Syntax trees for condition, update and projection expressions.

use std::collections::HashSet;
use std::fmt;

/// Condition, filter or key-condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `left op right`
    Compare {
        /// Left operand.
        left: Operand,
        /// Operator.
        op: CompareOp,
        /// Right operand.
        right: Operand,
    },
    /// `value BETWEEN low AND high`
    Between {
        /// Tested operand.
        value: Operand,
        /// Inclusive lower bound.
        low: Operand,
        /// Inclusive upper bound.
        high: Operand,
    },
    /// `value IN (a, b, ...)`
    In {
        /// Tested operand.
        value: Operand,
        /// Candidates.
        list: Vec<Operand>,
    },
    /// `a AND b`
    And(Box<Condition>, Box<Condition>),
    /// `a OR b`
    Or(Box<Condition>, Box<Condition>),
    /// `NOT a`
    Not(Box<Condition>),
    /// Boolean function call.
    Function {
        /// Function.
        function: Function,
        /// Arguments.
        args: Vec<Operand>,
    },
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Boolean functions usable as conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    /// `attribute_exists(path)`
    AttributeExists,
    /// `attribute_not_exists(path)`
    AttributeNotExists,
    /// `attribute_type(path, :type)`
    AttributeType,
    /// `begins_with(path, :prefix)`
    BeginsWith,
    /// `contains(path, :operand)`
    Contains,
}

impl Function {
    /// Number of arguments the function takes.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::AttributeExists | Self::AttributeNotExists => 1,
            Self::AttributeType | Self::BeginsWith | Self::Contains => 2,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AttributeExists => "attribute_exists",
            Self::AttributeNotExists => "attribute_not_exists",
            Self::AttributeType => "attribute_type",
            Self::BeginsWith => "begins_with",
            Self::Contains => "contains",
        })
    }
}

/// A value producer.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Document path.
    Path(Path),
    /// `:placeholder`, stored with its colon.
    Value(String),
    /// `size(path)`
    Size(Path),
}

/// Document path such as `#a.b[2]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    /// The first element's name.
    #[must_use]
    pub fn head(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathElement::Name(name)) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.0.iter().enumerate() {
            match element {
                PathElement::Name(name) if i == 0 => write!(f, "{name}")?,
                PathElement::Name(name) => write!(f, ".{name}")?,
                PathElement::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathElement {
    /// Attribute name or `#placeholder` (stored with its hash).
    Name(String),
    /// List index.
    Index(usize),
}

/// Right-hand side of a `SET` action.
#[derive(Debug, Clone, PartialEq)]
pub enum SetValue {
    /// Plain operand.
    Operand(Operand),
    /// `if_not_exists(path, fallback)`
    IfNotExists(Path, Box<SetValue>),
    /// `list_append(a, b)`
    ListAppend(Box<SetValue>, Box<SetValue>),
    /// `a + b`
    Plus(Box<SetValue>, Box<SetValue>),
    /// `a - b`
    Minus(Box<SetValue>, Box<SetValue>),
}

/// A parsed update expression, clauses in application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateExpr {
    /// `SET path = value`
    pub set: Vec<(Path, SetValue)>,
    /// `REMOVE path`
    pub remove: Vec<Path>,
    /// `ADD path :value`
    pub add: Vec<(Path, Operand)>,
    /// `DELETE path :value`
    pub delete: Vec<(Path, Operand)>,
}

impl UpdateExpr {
    /// Returns `true` if no clause has an action.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.remove.is_empty()
            && self.add.is_empty()
            && self.delete.is_empty()
    }

    /// Every path the update writes to.
    pub fn targets(&self) -> impl Iterator<Item = &Path> {
        self.set
            .iter()
            .map(|(p, _)| p)
            .chain(&self.remove)
            .chain(self.add.iter().map(|(p, _)| p))
            .chain(self.delete.iter().map(|(p, _)| p))
    }
}

/// Placeholders referenced by a request's expressions.
#[derive(Debug, Default)]
pub struct References {
    /// `#name` placeholders.
    pub names: HashSet<String>,
    /// `:value` placeholders.
    pub values: HashSet<String>,
}

impl References {
    /// Record the placeholders of a condition.
    pub fn condition(&mut self, condition: &Condition) {
        match condition {
            Condition::Compare { left, right, .. } => {
                self.operand(left);
                self.operand(right);
            }
            Condition::Between { value, low, high } => {
                self.operand(value);
                self.operand(low);
                self.operand(high);
            }
            Condition::In { value, list } => {
                self.operand(value);
                list.iter().for_each(|o| self.operand(o));
            }
            Condition::And(a, b) | Condition::Or(a, b) => {
                self.condition(a);
                self.condition(b);
            }
            Condition::Not(inner) => self.condition(inner),
            Condition::Function { args, .. } => args.iter().for_each(|o| self.operand(o)),
        }
    }

    /// Record the placeholders of an update.
    pub fn update(&mut self, update: &UpdateExpr) {
        for (path, value) in &update.set {
            self.path(path);
            self.set_value(value);
        }
        update.remove.iter().for_each(|p| self.path(p));
        for (path, operand) in update.add.iter().chain(&update.delete) {
            self.path(path);
            self.operand(operand);
        }
    }

    /// Record the placeholders of a projection.
    pub fn projection(&mut self, paths: &[Path]) {
        paths.iter().for_each(|p| self.path(p));
    }

    fn set_value(&mut self, value: &SetValue) {
        match value {
            SetValue::Operand(o) => self.operand(o),
            SetValue::IfNotExists(path, fallback) => {
                self.path(path);
                self.set_value(fallback);
            }
            SetValue::ListAppend(a, b) | SetValue::Plus(a, b) | SetValue::Minus(a, b) => {
                self.set_value(a);
                self.set_value(b);
            }
        }
    }

    fn operand(&mut self, operand: &Operand) {
        match operand {
            Operand::Path(path) | Operand::Size(path) => self.path(path),
            Operand::Value(name) => {
                self.values.insert(name.clone());
            }
        }
    }

    fn path(&mut self, path: &Path) {
        for element in &path.0 {
            if let PathElement::Name(name) = element {
                if name.starts_with('#') {
                    self.names.insert(name.clone());
                }
            }
        }
    }
}
