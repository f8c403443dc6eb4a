use super::expr::Expr;
use super::loc::Loc;

/// A method or `new` parameter: `id : typeName`.
#[derive(Debug, Clone)]
pub struct Formal {
    pub id: String,
    pub type_name: String,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct Attribute<T> {
    pub id: String,
    pub type_name: String,
    pub init: Option<Expr<T>>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub struct Method<T> {
    pub id: String,
    pub formals: Vec<Formal>,
    pub return_type: String,
    pub body: Expr<T>,
    pub loc: Loc,
}

#[derive(Debug, Clone)]
pub enum Feature<T> {
    Attribute(Attribute<T>),
    Method(Method<T>),
}

#[derive(Debug, Clone)]
pub struct Class<T> {
    pub name: String,
    pub parent: Option<String>,
    pub features: Vec<Feature<T>>,
    pub loc: Loc,
}

impl<T> Class<T> {
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute<T>> {
        self.features.iter().filter_map(|f| match f {
            Feature::Attribute(a) => Some(a),
            Feature::Method(_) => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method<T>> {
        self.features.iter().filter_map(|f| match f {
            Feature::Method(m) => Some(m),
            Feature::Attribute(_) => None,
        })
    }
}

/// A whole COOL program: the classes declared in source, in declaration
/// order. Built-in classes are not part of this list — `ClassRegistry`
/// injects them during bootstrap (spec.md §4.1).
#[derive(Debug, Clone)]
pub struct Program<T> {
    pub classes: Vec<Class<T>>,
}
