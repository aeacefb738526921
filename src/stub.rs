//! Stub generator: emits recorder-backed stand-in bodies for declarations
//! that are mocked rather than cloned.

use crate::model::{
    fixup_param_names, params_decl_string, params_invoke_string, params_type_only_string,
    returns_decl_string, ImportSpec, Param,
};

/// The abstract recorder a stub records calls against and decodes configured
/// responses from. Defaults to testify's `mock.Mock`; any library with the
/// same record/slot/error shape plugs in by renaming.
#[derive(Debug, Clone)]
pub struct Recorder {
    /// Import the generated unit needs for the embed type.
    pub import: ImportSpec,
    /// Embedded type providing the recorder, e.g. `mock.Mock`.
    pub embed_type: String,
    /// Record-call operation accepting a flat `...interface{}` sequence.
    pub record_method: String,
    /// Positional accessor for a configured response slot.
    pub slot_method: String,
    /// Dedicated accessor decoding the canonical error type.
    pub error_method: String,
    /// The canonical error/failure type of the target language.
    pub error_type: String,
}

impl Default for Recorder {
    fn default() -> Self {
        Self {
            import: ImportSpec {
                alias: "mock".to_string(),
                path: "github.com/stretchr/testify/mock".to_string(),
                named: false,
            },
            embed_type: "mock.Mock".to_string(),
            record_method: "Called".to_string(),
            slot_method: "Get".to_string(),
            error_method: "Error".to_string(),
            error_type: "error".to_string(),
        }
    }
}

/// Emits one stub: a method on `group` that forwards its arguments to the
/// recorder and decodes configured return values slot by slot.
pub fn emit_stub(
    out: &mut String,
    group: &str,
    fn_name: &str,
    params: &[Param],
    returns: &[Param],
    recorder: &Recorder,
) {
    let mut params = params.to_vec();
    fixup_param_names(&mut params);

    let ret_decl = returns_decl_string(returns);
    if ret_decl.is_empty() {
        out.push_str(&format!(
            "func (m *{group}) {fn_name}({}) {{\n",
            params_decl_string(&params)
        ));
    } else {
        out.push_str(&format!(
            "func (m *{group}) {fn_name}({}) {ret_decl} {{\n",
            params_decl_string(&params)
        ));
    }

    let (record_expr, record_setup) = record_call_expr(&params, recorder);
    out.push_str(&record_setup);

    if returns.is_empty() {
        out.push_str(&format!("\t{record_expr}\n}}\n\n"));
        return;
    }

    out.push_str(&format!("\t_mc_ret := {record_expr}\n\n"));

    let invoke = params_invoke_string(&params);
    let type_only = params_type_only_string(&params);
    for (idx, slot) in returns.iter().enumerate() {
        let typ = &slot.typ;
        out.push_str(&format!("\tvar _r{idx} {typ}\n\n"));
        out.push_str(&format!(
            "\tif _rfn, ok := _mc_ret.{slot_m}({idx}).(func({type_only}) {typ}); ok {{\n",
            slot_m = recorder.slot_method
        ));
        out.push_str(&format!("\t\t_r{idx} = _rfn({invoke})\n"));
        out.push_str("\t} else {\n");
        if *typ == recorder.error_type {
            out.push_str(&format!(
                "\t\t_r{idx} = _mc_ret.{err_m}({idx})\n",
                err_m = recorder.error_method
            ));
        } else {
            out.push_str(&format!(
                "\t\tif _mc_ret.{slot_m}({idx}) != nil {{\n",
                slot_m = recorder.slot_method
            ));
            out.push_str(&format!(
                "\t\t\t_r{idx} = _mc_ret.{slot_m}({idx}).({typ})\n",
                slot_m = recorder.slot_method
            ));
            out.push_str("\t\t}\n");
        }
        out.push_str("\t}\n\n");
    }

    let slots: Vec<String> = (0..returns.len()).map(|i| format!("_r{i}")).collect();
    out.push_str(&format!("\treturn {}\n}}\n\n", slots.join(", ")));
}

/// Builds the record-call expression plus any variadic flattening that has
/// to run before it. The recorder's record operation accepts only a flat
/// `...interface{}` sequence, so variadic elements of any narrower type are
/// flattened into an explicit sequence first.
fn record_call_expr(params: &[Param], recorder: &Recorder) -> (String, String) {
    let record = &recorder.record_method;
    if params.is_empty() {
        return (format!("m.{record}()"), String::new());
    }

    let last = &params[params.len() - 1];
    if !last.variadic {
        let args: Vec<&str> = params.iter().map(|p| p.name.as_str()).collect();
        return (format!("m.{record}({})", args.join(", ")), String::new());
    }

    if last.typ == "...interface{}" && params.len() == 1 {
        return (format!("m.{record}({}...)", last.name), String::new());
    }

    let mut setup = String::new();
    setup.push_str(&format!(
        "\t_mc_args := make([]interface{{}}, 0, {}+len({}))\n\n",
        params.len() - 1,
        last.name
    ));
    for param in &params[..params.len() - 1] {
        setup.push_str(&format!("\t_mc_args = append(_mc_args, {})\n", param.name));
    }
    setup.push_str(&format!(
        "\n\tfor _, _va := range {} {{\n\t\t_mc_args = append(_mc_args, _va)\n\t}}\n\n",
        last.name
    ));
    (format!("m.{record}(_mc_args...)"), setup)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit(params: &[Param], returns: &[Param]) -> String {
        let mut out = String::new();
        emit_stub(&mut out, "grp", "Fn", params, returns, &Recorder::default());
        out
    }

    #[test]
    fn void_stub_records_and_nothing_else() {
        let text = emit(&[Param::new("a", "int")], &[]);
        assert!(text.contains("func (m *grp) Fn(a int) {"));
        assert!(text.contains("m.Called(a)"));
        assert!(!text.contains("_mc_ret"));
    }

    #[test]
    fn error_slot_uses_error_accessor_and_value_slot_asserts() {
        let text = emit(
            &[Param::new("a", "int")],
            &[Param::new("", "string"), Param::new("", "error")],
        );
        assert!(text.contains("_mc_ret := m.Called(a)"));
        assert!(text.contains("if _rfn, ok := _mc_ret.Get(0).(func(int) string); ok {"));
        assert!(text.contains("_r0 = _mc_ret.Get(0).(string)"));
        assert!(text.contains("_r1 = _mc_ret.Error(1)"));
        assert!(text.contains("return _r0, _r1"));
    }

    #[test]
    fn narrow_variadic_flattens_into_any_sequence() {
        let text = emit(
            &[Param::new("format", "string"), Param::new("args", "...string")],
            &[Param::new("", "string")],
        );
        assert!(text.contains("_mc_args := make([]interface{}, 0, 1+len(args))"));
        assert!(text.contains("_mc_args = append(_mc_args, format)"));
        assert!(text.contains("for _, _va := range args {"));
        assert!(text.contains("m.Called(_mc_args...)"));
        assert!(text.contains("_rfn(format, args...)"));
    }

    #[test]
    fn sole_any_variadic_passes_straight_through() {
        let text = emit(&[Param::new("args", "...interface{}")], &[]);
        assert!(text.contains("m.Called(args...)"));
        assert!(!text.contains("_mc_args"));
    }

    #[test]
    fn any_variadic_behind_other_params_still_flattens() {
        let text = emit(
            &[Param::new("format", "string"), Param::new("args", "...interface{}")],
            &[],
        );
        assert!(text.contains("_mc_args := make([]interface{}, 0, 1+len(args))"));
    }

    #[test]
    fn unnamed_params_get_synthetic_names() {
        let text = emit(
            &[Param::new("", "string"), Param::new("", "int")],
            &[Param::new("", "error")],
        );
        assert!(text.contains("func (m *grp) Fn(_a0 string, _a1 int) error {"));
        assert!(text.contains("m.Called(_a0, _a1)"));
    }
}
