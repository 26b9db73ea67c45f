//! Operator constructors for the aggregation expression language.
//!
//! Thin wrappers that pick the wire shape for each operator: plain
//! operand-list operators ride [`Expression::Operator`] and get the
//! arity-dependent array wrapper; operators with named arguments build
//! [`Expression::NamedOperator`] through small builders that omit absent
//! options.

use bson::Bson;

use super::{Expression, IndexOf};

pub use super::accumulators::*;
pub use super::{array, document, field, value};

fn op(name: &'static str, operands: Vec<Expression>) -> Expression {
    Expression::Operator { name, operands }
}

fn unary(name: &'static str, operand: Expression) -> Expression {
    op(name, vec![operand])
}

fn binary(name: &'static str, a: Expression, b: Expression) -> Expression {
    op(name, vec![a, b])
}

fn variadic(name: &'static str, operands: impl IntoIterator<Item = Expression>) -> Expression {
    op(name, operands.into_iter().collect())
}

pub(crate) fn named(
    name: &'static str,
    fields: Vec<(&'static str, Option<Expression>)>,
) -> Expression {
    Expression::NamedOperator {
        name,
        fields: fields
            .into_iter()
            .filter_map(|(field, expression)| Some((field.to_string(), expression?)))
            .collect(),
    }
}

// ── Arithmetic ──────────────────────────────────────────────────

pub fn abs(e: Expression) -> Expression {
    unary("$abs", e)
}

pub fn add(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$add", operands)
}

pub fn ceil(e: Expression) -> Expression {
    unary("$ceil", e)
}

pub fn divide(a: Expression, b: Expression) -> Expression {
    binary("$divide", a, b)
}

pub fn exp(e: Expression) -> Expression {
    unary("$exp", e)
}

pub fn floor(e: Expression) -> Expression {
    unary("$floor", e)
}

pub fn ln(e: Expression) -> Expression {
    unary("$ln", e)
}

pub fn log(number: Expression, base: Expression) -> Expression {
    binary("$log", number, base)
}

pub fn log10(e: Expression) -> Expression {
    unary("$log10", e)
}

pub fn mod_(a: Expression, b: Expression) -> Expression {
    binary("$mod", a, b)
}

pub fn multiply(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$multiply", operands)
}

pub fn pow(base: Expression, exponent: Expression) -> Expression {
    binary("$pow", base, exponent)
}

pub fn round(e: Expression) -> Expression {
    unary("$round", e)
}

pub fn round_to(e: Expression, place: Expression) -> Expression {
    binary("$round", e, place)
}

pub fn sqrt(e: Expression) -> Expression {
    unary("$sqrt", e)
}

pub fn subtract(a: Expression, b: Expression) -> Expression {
    binary("$subtract", a, b)
}

pub fn trunc(e: Expression) -> Expression {
    unary("$trunc", e)
}

pub fn trunc_to(e: Expression, place: Expression) -> Expression {
    binary("$trunc", e, place)
}

// ── Comparison ──────────────────────────────────────────────────

pub fn cmp(a: Expression, b: Expression) -> Expression {
    binary("$cmp", a, b)
}

pub fn eq(a: Expression, b: Expression) -> Expression {
    binary("$eq", a, b)
}

pub fn ne(a: Expression, b: Expression) -> Expression {
    binary("$ne", a, b)
}

pub fn gt(a: Expression, b: Expression) -> Expression {
    binary("$gt", a, b)
}

pub fn gte(a: Expression, b: Expression) -> Expression {
    binary("$gte", a, b)
}

pub fn lt(a: Expression, b: Expression) -> Expression {
    binary("$lt", a, b)
}

pub fn lte(a: Expression, b: Expression) -> Expression {
    binary("$lte", a, b)
}

// ── Boolean / conditional ───────────────────────────────────────

pub fn and(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$and", operands)
}

pub fn or(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$or", operands)
}

pub fn not(e: Expression) -> Expression {
    unary("$not", e)
}

/// `$cond` in its positional `[if, then, else]` form.
pub fn cond(if_: Expression, then: Expression, else_: Expression) -> Expression {
    op("$cond", vec![if_, then, else_])
}

/// `$ifNull` — any number of candidates followed by the replacement.
pub fn if_null(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$ifNull", operands)
}

/// `$switch` branch list.
#[derive(Debug, Clone, Default)]
pub struct Switch {
    branches: Vec<(Expression, Expression)>,
    default: Option<Expression>,
}

pub fn switch() -> Switch {
    Switch::default()
}

impl Switch {
    pub fn branch(mut self, case: Expression, then: Expression) -> Self {
        self.branches.push((case, then));
        self
    }

    pub fn default_(mut self, default: Expression) -> Self {
        self.default = Some(default);
        self
    }
}

impl From<Switch> for Expression {
    fn from(s: Switch) -> Self {
        let branches = Expression::Array(
            s.branches
                .into_iter()
                .map(|(case, then)| {
                    Expression::Document(vec![("case".into(), case), ("then".into(), then)])
                })
                .collect(),
        );
        named("$switch", vec![("branches", Some(branches)), ("default", s.default)])
    }
}

// ── Array ───────────────────────────────────────────────────────

pub fn array_elem_at(array: Expression, index: Expression) -> Expression {
    binary("$arrayElemAt", array, index)
}

pub fn array_to_object(e: Expression) -> Expression {
    unary("$arrayToObject", e)
}

pub fn concat_arrays(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$concatArrays", operands)
}

pub fn first(e: Expression) -> Expression {
    unary("$first", e)
}

/// `$in` — needle then array.
pub fn in_(needle: Expression, array: Expression) -> Expression {
    binary("$in", needle, array)
}

pub fn index_of_array(haystack: Expression, needle: Expression) -> IndexOf {
    IndexOf {
        name: "$indexOfArray",
        haystack: Box::new(haystack),
        needle: Box::new(needle),
        start: None,
        end: None,
    }
}

pub fn is_array(e: Expression) -> Expression {
    unary("$isArray", e)
}

pub fn last(e: Expression) -> Expression {
    unary("$last", e)
}

pub fn object_to_array(e: Expression) -> Expression {
    unary("$objectToArray", e)
}

pub fn range(start: Expression, end: Expression) -> Expression {
    binary("$range", start, end)
}

pub fn range_step(start: Expression, end: Expression, step: Expression) -> Expression {
    op("$range", vec![start, end, step])
}

pub fn reverse_array(e: Expression) -> Expression {
    unary("$reverseArray", e)
}

pub fn size(e: Expression) -> Expression {
    unary("$size", e)
}

pub fn slice(array: Expression, n: Expression) -> Expression {
    binary("$slice", array, n)
}

pub fn slice_from(array: Expression, position: Expression, n: Expression) -> Expression {
    op("$slice", vec![array, position, n])
}

/// `$filter` with named arguments.
#[derive(Debug, Clone)]
pub struct FilterOp {
    input: Expression,
    cond: Expression,
    as_name: Option<String>,
    limit: Option<Expression>,
}

pub fn filter_(input: Expression, cond: Expression) -> FilterOp {
    FilterOp {
        input,
        cond,
        as_name: None,
        limit: None,
    }
}

impl FilterOp {
    pub fn as_name(mut self, name: &str) -> Self {
        self.as_name = Some(name.to_string());
        self
    }

    pub fn limit(mut self, limit: Expression) -> Self {
        self.limit = Some(limit);
        self
    }
}

impl From<FilterOp> for Expression {
    fn from(f: FilterOp) -> Self {
        named(
            "$filter",
            vec![
                ("input", Some(f.input)),
                ("cond", Some(f.cond)),
                ("as", f.as_name.map(|n| Expression::Literal(Bson::String(n)))),
                ("limit", f.limit),
            ],
        )
    }
}

/// `$map` with named arguments.
#[derive(Debug, Clone)]
pub struct MapOp {
    input: Expression,
    in_: Expression,
    as_name: Option<String>,
}

pub fn map_(input: Expression, in_: Expression) -> MapOp {
    MapOp {
        input,
        in_,
        as_name: None,
    }
}

impl MapOp {
    pub fn as_name(mut self, name: &str) -> Self {
        self.as_name = Some(name.to_string());
        self
    }
}

impl From<MapOp> for Expression {
    fn from(m: MapOp) -> Self {
        named(
            "$map",
            vec![
                ("input", Some(m.input)),
                ("as", m.as_name.map(|n| Expression::Literal(Bson::String(n)))),
                ("in", Some(m.in_)),
            ],
        )
    }
}

pub fn reduce(input: Expression, initial_value: Expression, in_: Expression) -> Expression {
    named(
        "$reduce",
        vec![
            ("input", Some(input)),
            ("initialValue", Some(initial_value)),
            ("in", Some(in_)),
        ],
    )
}

/// `$zip` over multiple input arrays.
#[derive(Debug, Clone)]
pub struct Zip {
    inputs: Vec<Expression>,
    use_longest_length: bool,
    defaults: Option<Expression>,
}

pub fn zip(inputs: impl IntoIterator<Item = Expression>) -> Zip {
    Zip {
        inputs: inputs.into_iter().collect(),
        use_longest_length: false,
        defaults: None,
    }
}

impl Zip {
    pub fn use_longest_length(mut self) -> Self {
        self.use_longest_length = true;
        self
    }

    pub fn defaults(mut self, defaults: Expression) -> Self {
        self.defaults = Some(defaults);
        self
    }
}

impl From<Zip> for Expression {
    fn from(z: Zip) -> Self {
        let longest = z
            .use_longest_length
            .then(|| Expression::Literal(Bson::Boolean(true)));
        named(
            "$zip",
            vec![
                ("inputs", Some(Expression::Array(z.inputs))),
                ("useLongestLength", longest),
                ("defaults", z.defaults),
            ],
        )
    }
}

// ── String ──────────────────────────────────────────────────────

pub fn concat(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$concat", operands)
}

pub fn index_of_bytes(haystack: Expression, needle: Expression) -> IndexOf {
    IndexOf {
        name: "$indexOfBytes",
        haystack: Box::new(haystack),
        needle: Box::new(needle),
        start: None,
        end: None,
    }
}

pub fn index_of_cp(haystack: Expression, needle: Expression) -> IndexOf {
    IndexOf {
        name: "$indexOfCP",
        haystack: Box::new(haystack),
        needle: Box::new(needle),
        start: None,
        end: None,
    }
}

/// `$trim` / `$ltrim` / `$rtrim`.
#[derive(Debug, Clone)]
pub struct Trim {
    name: &'static str,
    input: Expression,
    chars: Option<Expression>,
}

pub fn trim(input: Expression) -> Trim {
    Trim {
        name: "$trim",
        input,
        chars: None,
    }
}

pub fn ltrim(input: Expression) -> Trim {
    Trim {
        name: "$ltrim",
        input,
        chars: None,
    }
}

pub fn rtrim(input: Expression) -> Trim {
    Trim {
        name: "$rtrim",
        input,
        chars: None,
    }
}

impl Trim {
    pub fn chars(mut self, chars: Expression) -> Self {
        self.chars = Some(chars);
        self
    }
}

impl From<Trim> for Expression {
    fn from(t: Trim) -> Self {
        named(t.name, vec![("input", Some(t.input)), ("chars", t.chars)])
    }
}

/// `$regexFind` / `$regexFindAll` / `$regexMatch`.
#[derive(Debug, Clone)]
pub struct RegexOp {
    name: &'static str,
    input: Expression,
    regex: Expression,
    options: Option<String>,
}

pub fn regex_find(input: Expression, pattern: Expression) -> RegexOp {
    RegexOp {
        name: "$regexFind",
        input,
        regex: pattern,
        options: None,
    }
}

pub fn regex_find_all(input: Expression, pattern: Expression) -> RegexOp {
    RegexOp {
        name: "$regexFindAll",
        input,
        regex: pattern,
        options: None,
    }
}

pub fn regex_match(input: Expression, pattern: Expression) -> RegexOp {
    RegexOp {
        name: "$regexMatch",
        input,
        regex: pattern,
        options: None,
    }
}

impl RegexOp {
    pub fn options(mut self, options: &str) -> Self {
        self.options = Some(options.to_string());
        self
    }
}

impl From<RegexOp> for Expression {
    fn from(r: RegexOp) -> Self {
        named(
            r.name,
            vec![
                ("input", Some(r.input)),
                ("regex", Some(r.regex)),
                (
                    "options",
                    r.options.map(|o| Expression::Literal(Bson::String(o))),
                ),
            ],
        )
    }
}

pub fn replace_one(input: Expression, find: Expression, replacement: Expression) -> Expression {
    named(
        "$replaceOne",
        vec![
            ("input", Some(input)),
            ("find", Some(find)),
            ("replacement", Some(replacement)),
        ],
    )
}

pub fn replace_all(input: Expression, find: Expression, replacement: Expression) -> Expression {
    named(
        "$replaceAll",
        vec![
            ("input", Some(input)),
            ("find", Some(find)),
            ("replacement", Some(replacement)),
        ],
    )
}

pub fn split(string: Expression, delimiter: Expression) -> Expression {
    binary("$split", string, delimiter)
}

pub fn str_len_bytes(e: Expression) -> Expression {
    unary("$strLenBytes", e)
}

pub fn str_len_cp(e: Expression) -> Expression {
    unary("$strLenCP", e)
}

pub fn strcasecmp(a: Expression, b: Expression) -> Expression {
    binary("$strcasecmp", a, b)
}

pub fn substr_bytes(string: Expression, start: Expression, length: Expression) -> Expression {
    op("$substrBytes", vec![string, start, length])
}

pub fn substr_cp(string: Expression, start: Expression, length: Expression) -> Expression {
    op("$substrCP", vec![string, start, length])
}

pub fn to_lower(e: Expression) -> Expression {
    unary("$toLower", e)
}

pub fn to_upper(e: Expression) -> Expression {
    unary("$toUpper", e)
}

// ── Date ────────────────────────────────────────────────────────

pub fn day_of_month(e: Expression) -> Expression {
    unary("$dayOfMonth", e)
}

pub fn day_of_week(e: Expression) -> Expression {
    unary("$dayOfWeek", e)
}

pub fn day_of_year(e: Expression) -> Expression {
    unary("$dayOfYear", e)
}

pub fn hour(e: Expression) -> Expression {
    unary("$hour", e)
}

pub fn millisecond(e: Expression) -> Expression {
    unary("$millisecond", e)
}

pub fn minute(e: Expression) -> Expression {
    unary("$minute", e)
}

pub fn month(e: Expression) -> Expression {
    unary("$month", e)
}

pub fn second(e: Expression) -> Expression {
    unary("$second", e)
}

pub fn week(e: Expression) -> Expression {
    unary("$week", e)
}

pub fn year(e: Expression) -> Expression {
    unary("$year", e)
}

/// `$dateToString` with named optionals.
#[derive(Debug, Clone)]
pub struct DateToString {
    date: Expression,
    format: Option<String>,
    timezone: Option<String>,
    on_null: Option<Expression>,
}

pub fn date_to_string(date: Expression) -> DateToString {
    DateToString {
        date,
        format: None,
        timezone: None,
        on_null: None,
    }
}

impl DateToString {
    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }

    pub fn on_null(mut self, on_null: Expression) -> Self {
        self.on_null = Some(on_null);
        self
    }
}

impl From<DateToString> for Expression {
    fn from(d: DateToString) -> Self {
        named(
            "$dateToString",
            vec![
                ("date", Some(d.date)),
                (
                    "format",
                    d.format.map(|f| Expression::Literal(Bson::String(f))),
                ),
                (
                    "timezone",
                    d.timezone.map(|t| Expression::Literal(Bson::String(t))),
                ),
                ("onNull", d.on_null),
            ],
        )
    }
}

/// `$dateFromString` with named optionals.
#[derive(Debug, Clone)]
pub struct DateFromString {
    date_string: Expression,
    format: Option<String>,
    timezone: Option<String>,
    on_error: Option<Expression>,
    on_null: Option<Expression>,
}

pub fn date_from_string(date_string: Expression) -> DateFromString {
    DateFromString {
        date_string,
        format: None,
        timezone: None,
        on_error: None,
        on_null: None,
    }
}

impl DateFromString {
    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }

    pub fn on_error(mut self, on_error: Expression) -> Self {
        self.on_error = Some(on_error);
        self
    }

    pub fn on_null(mut self, on_null: Expression) -> Self {
        self.on_null = Some(on_null);
        self
    }
}

impl From<DateFromString> for Expression {
    fn from(d: DateFromString) -> Self {
        named(
            "$dateFromString",
            vec![
                ("dateString", Some(d.date_string)),
                (
                    "format",
                    d.format.map(|f| Expression::Literal(Bson::String(f))),
                ),
                (
                    "timezone",
                    d.timezone.map(|t| Expression::Literal(Bson::String(t))),
                ),
                ("onError", d.on_error),
                ("onNull", d.on_null),
            ],
        )
    }
}

/// `$dateAdd` / `$dateSubtract`.
#[derive(Debug, Clone)]
pub struct DateArith {
    name: &'static str,
    start_date: Expression,
    unit: String,
    amount: Expression,
    timezone: Option<String>,
}

pub fn date_add(start_date: Expression, unit: &str, amount: Expression) -> DateArith {
    DateArith {
        name: "$dateAdd",
        start_date,
        unit: unit.to_string(),
        amount,
        timezone: None,
    }
}

pub fn date_subtract(start_date: Expression, unit: &str, amount: Expression) -> DateArith {
    DateArith {
        name: "$dateSubtract",
        start_date,
        unit: unit.to_string(),
        amount,
        timezone: None,
    }
}

impl DateArith {
    pub fn timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }
}

impl From<DateArith> for Expression {
    fn from(d: DateArith) -> Self {
        named(
            d.name,
            vec![
                ("startDate", Some(d.start_date)),
                ("unit", Some(Expression::Literal(Bson::String(d.unit)))),
                ("amount", Some(d.amount)),
                (
                    "timezone",
                    d.timezone.map(|t| Expression::Literal(Bson::String(t))),
                ),
            ],
        )
    }
}

/// `$dateDiff`.
#[derive(Debug, Clone)]
pub struct DateDiff {
    start_date: Expression,
    end_date: Expression,
    unit: String,
    timezone: Option<String>,
    start_of_week: Option<String>,
}

pub fn date_diff(start_date: Expression, end_date: Expression, unit: &str) -> DateDiff {
    DateDiff {
        start_date,
        end_date,
        unit: unit.to_string(),
        timezone: None,
        start_of_week: None,
    }
}

impl DateDiff {
    pub fn timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }

    pub fn start_of_week(mut self, day: &str) -> Self {
        self.start_of_week = Some(day.to_string());
        self
    }
}

impl From<DateDiff> for Expression {
    fn from(d: DateDiff) -> Self {
        named(
            "$dateDiff",
            vec![
                ("startDate", Some(d.start_date)),
                ("endDate", Some(d.end_date)),
                ("unit", Some(Expression::Literal(Bson::String(d.unit)))),
                (
                    "timezone",
                    d.timezone.map(|t| Expression::Literal(Bson::String(t))),
                ),
                (
                    "startOfWeek",
                    d.start_of_week.map(|s| Expression::Literal(Bson::String(s))),
                ),
            ],
        )
    }
}

/// `$dateTrunc`.
#[derive(Debug, Clone)]
pub struct DateTrunc {
    date: Expression,
    unit: String,
    bin_size: Option<i64>,
    timezone: Option<String>,
    start_of_week: Option<String>,
}

pub fn date_trunc(date: Expression, unit: &str) -> DateTrunc {
    DateTrunc {
        date,
        unit: unit.to_string(),
        bin_size: None,
        timezone: None,
        start_of_week: None,
    }
}

impl DateTrunc {
    pub fn bin_size(mut self, bin_size: i64) -> Self {
        self.bin_size = Some(bin_size);
        self
    }

    pub fn timezone(mut self, timezone: &str) -> Self {
        self.timezone = Some(timezone.to_string());
        self
    }

    pub fn start_of_week(mut self, day: &str) -> Self {
        self.start_of_week = Some(day.to_string());
        self
    }
}

impl From<DateTrunc> for Expression {
    fn from(d: DateTrunc) -> Self {
        named(
            "$dateTrunc",
            vec![
                ("date", Some(d.date)),
                ("unit", Some(Expression::Literal(Bson::String(d.unit)))),
                (
                    "binSize",
                    d.bin_size.map(|b| Expression::Literal(Bson::Int64(b))),
                ),
                (
                    "timezone",
                    d.timezone.map(|t| Expression::Literal(Bson::String(t))),
                ),
                (
                    "startOfWeek",
                    d.start_of_week.map(|s| Expression::Literal(Bson::String(s))),
                ),
            ],
        )
    }
}

// ── Set ─────────────────────────────────────────────────────────

pub fn all_elements_true(e: Expression) -> Expression {
    unary("$allElementsTrue", e)
}

pub fn any_element_true(e: Expression) -> Expression {
    unary("$anyElementTrue", e)
}

pub fn set_difference(a: Expression, b: Expression) -> Expression {
    binary("$setDifference", a, b)
}

pub fn set_equals(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$setEquals", operands)
}

pub fn set_intersection(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$setIntersection", operands)
}

pub fn set_is_subset(a: Expression, b: Expression) -> Expression {
    binary("$setIsSubset", a, b)
}

pub fn set_union(operands: impl IntoIterator<Item = Expression>) -> Expression {
    variadic("$setUnion", operands)
}

// ── Type conversion ─────────────────────────────────────────────

/// `$convert` with named optionals.
#[derive(Debug, Clone)]
pub struct Convert {
    input: Expression,
    to: String,
    on_error: Option<Expression>,
    on_null: Option<Expression>,
}

pub fn convert(input: Expression, to: &str) -> Convert {
    Convert {
        input,
        to: to.to_string(),
        on_error: None,
        on_null: None,
    }
}

impl Convert {
    pub fn on_error(mut self, on_error: Expression) -> Self {
        self.on_error = Some(on_error);
        self
    }

    pub fn on_null(mut self, on_null: Expression) -> Self {
        self.on_null = Some(on_null);
        self
    }
}

impl From<Convert> for Expression {
    fn from(c: Convert) -> Self {
        named(
            "$convert",
            vec![
                ("input", Some(c.input)),
                ("to", Some(Expression::Literal(Bson::String(c.to)))),
                ("onError", c.on_error),
                ("onNull", c.on_null),
            ],
        )
    }
}

pub fn to_bool(e: Expression) -> Expression {
    unary("$toBool", e)
}

pub fn to_date(e: Expression) -> Expression {
    unary("$toDate", e)
}

pub fn to_decimal(e: Expression) -> Expression {
    unary("$toDecimal", e)
}

pub fn to_double(e: Expression) -> Expression {
    unary("$toDouble", e)
}

pub fn to_int(e: Expression) -> Expression {
    unary("$toInt", e)
}

pub fn to_long(e: Expression) -> Expression {
    unary("$toLong", e)
}

pub fn to_object_id(e: Expression) -> Expression {
    unary("$toObjectId", e)
}

pub fn to_string(e: Expression) -> Expression {
    unary("$toString", e)
}

pub fn type_of(e: Expression) -> Expression {
    unary("$type", e)
}

// ── Variables / misc ────────────────────────────────────────────

/// `$let` variable bindings.
#[derive(Debug, Clone, Default)]
pub struct Let {
    vars: Vec<(String, Expression)>,
}

pub fn let_() -> Let {
    Let::default()
}

impl Let {
    pub fn var(mut self, name: &str, e: Expression) -> Self {
        self.vars.push((name.to_string(), e));
        self
    }

    /// Finish with the expression evaluated under the bindings.
    pub fn in_(self, in_: Expression) -> Expression {
        named(
            "$let",
            vec![
                ("vars", Some(Expression::Document(self.vars))),
                ("in", Some(in_)),
            ],
        )
    }
}

/// `$literal` — shields a value from operator interpretation.
pub fn literal(v: impl Into<Bson>) -> Expression {
    unary("$literal", Expression::Literal(v.into()))
}

/// `$meta` — e.g. `meta("textScore")`.
pub fn meta(keyword: &str) -> Expression {
    unary("$meta", Expression::Literal(Bson::String(keyword.to_string())))
}

pub fn rand() -> Expression {
    op("$rand", Vec::new())
}

pub fn sample_rate(rate: f64) -> Expression {
    unary("$sampleRate", Expression::Literal(Bson::Double(rate)))
}

pub fn get_field(field: &str) -> Expression {
    unary(
        "$getField",
        Expression::Literal(Bson::String(field.to_string())),
    )
}

pub fn get_field_in(field: &str, input: Expression) -> Expression {
    named(
        "$getField",
        vec![
            (
                "field",
                Some(Expression::Literal(Bson::String(field.to_string()))),
            ),
            ("input", Some(input)),
        ],
    )
}
