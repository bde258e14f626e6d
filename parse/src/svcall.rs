// svcall.rs - SVC call binding extractor
//
// Last pass: read `SVCALL(SYMBOL, return_type, name(args...));` invocations,
// reassembling the ones that wrap over several lines, and keep those whose
// symbol the resolver numbered.

use crate::context::ParseContext;
use crate::dialect::Dialect;
use crate::error::{Construct, Diagnostic, Diagnostics};
use crate::lex::{self, TokenKind};
use crate::model::SvcCallRecord;
use crate::source::{LineCursor, SourceFile};
use tracing::debug;

/// A parsed call-binding macro invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallBinding {
    pub symbol: String,
    pub return_type: String,
    pub function: String,
    pub arguments: Vec<String>,
}

/// Byte offset of the call macro invocation in a line, if any
fn find_call(text: &str, macro_name: &str) -> Option<usize> {
    let tokens = lex::tokenize(text);
    tokens
        .windows(2)
        .find(|w| w[0].is_ident(macro_name) && w[1].is_punct('('))
        .map(|w| w[0].span.start)
}

/// Collect the invocation starting at `text` up to its closing parenthesis
fn read_call(text: String, cursor: &mut LineCursor<'_>) -> Option<String> {
    let mut buf = text;
    loop {
        let tokens = lex::tokenize(&buf);
        let end = lex::matching_close(&tokens, 1).map(|close| tokens[close].span.end);
        if let Some(end) = end {
            buf.truncate(end);
            return Some(buf);
        }
        let line = cursor.next_line()?;
        buf.push('\n');
        buf.push_str(&line.text);
    }
}

/// Split a complete invocation into its parts
pub fn parse_call(text: &str) -> Option<CallBinding> {
    let tokens = lex::tokenize(text);
    let close = lex::matching_close(&tokens, 1)?;
    let args = lex::split_top_level(&tokens[2..close], ',');
    let [symbol, return_type, prototype, ..] = args.as_slice() else {
        return None;
    };

    let open = prototype.iter().position(|t| t.is_punct('('))?;
    let function = prototype[..open]
        .last()
        .filter(|t| t.kind == TokenKind::Ident)?;
    let params_close = lex::matching_close(prototype, open)?;
    let arguments = lex::split_top_level(&prototype[open + 1..params_close], ',')
        .into_iter()
        .filter(|param| !param.is_empty())
        .map(|param| lex::squash_whitespace(lex::span_text(text, param)))
        .collect();

    Some(CallBinding {
        symbol: lex::squash_whitespace(lex::span_text(text, symbol)),
        return_type: lex::squash_whitespace(lex::span_text(text, return_type)),
        function: function.text.to_string(),
        arguments,
    })
}

/// Call bindings of one header whose symbol has a resolved number
pub fn extract(
    file: &SourceFile,
    ctx: &ParseContext,
    dialect: &Dialect,
    diags: &mut Diagnostics,
) -> Vec<SvcCallRecord> {
    let mut records = Vec::new();
    let mut cursor = file.cursor();

    while let Some(line) = cursor.next_line() {
        let Some(start) = find_call(&line.text, &dialect.call_macro) else {
            continue;
        };

        let Some(invocation) = read_call(line.text[start..].to_string(), &mut cursor) else {
            diags.report(Diagnostic::UnterminatedConstruct {
                path: file.path.clone(),
                line: line.number,
                construct: Construct::CallBinding,
            });
            break;
        };

        let Some(binding) = parse_call(&invocation) else {
            debug!(path = %file.path.display(), line = line.number, "malformed call binding");
            continue;
        };

        // The macro's own definition: SVCALL(number, return_type, signature)
        if binding.symbol == dialect.call_placeholder {
            continue;
        }

        let Some(number) = ctx.syscall_number(&binding.symbol) else {
            diags.report(Diagnostic::UnresolvedSymbol {
                path: file.path.clone(),
                line: line.number,
                symbol: binding.symbol,
            });
            continue;
        };

        records.push(SvcCallRecord {
            syscall_number: number.to_string(),
            syscall_symbol: binding.symbol,
            function_name: binding.function,
            return_type: binding.return_type,
            argument_list: binding.arguments,
            signature: ctx.signature().clone(),
        });
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FirmwareSignature;
    use crate::{ranges, svcs};

    fn context(files: &[SourceFile]) -> ParseContext {
        let dialect = Dialect::default();
        let sig = FirmwareSignature::from("sig");
        let (table, _) = ranges::build(files, &dialect, &sig);
        let numbers = svcs::resolve(files, &table, &dialect, &mut Diagnostics::default());
        ParseContext::new(sig, numbers)
    }

    #[test]
    fn test_parse_single_line_call() {
        let call = parse_call("SVCALL(SD_BLE_GAP_ADDR_SET, uint32_t, sd_ble_gap_addr_set(ble_gap_addr_t const *p_addr))").unwrap();
        assert_eq!(call.symbol, "SD_BLE_GAP_ADDR_SET");
        assert_eq!(call.return_type, "uint32_t");
        assert_eq!(call.function, "sd_ble_gap_addr_set");
        assert_eq!(call.arguments, ["ble_gap_addr_t const *p_addr"]);
    }

    #[test]
    fn test_empty_parameter_list() {
        let call = parse_call("SVCALL(SD_X, uint32_t, sd_x())").unwrap();
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn test_multi_line_call_reassembled() {
        let header = SourceFile::new(
            "ble_gap.h",
            "#define BLE_GAP_SVC_BASE 0x7C\n\
             enum BLE_GAP_SVCS\n{\n  SD_BLE_GAP_ADV_DATA_SET = BLE_GAP_SVC_BASE,\n};\n\
             SVCALL(SD_BLE_GAP_ADV_DATA_SET, uint32_t, sd_ble_gap_adv_data_set(uint8_t const * const p_data, uint8_t dlen,\n\
                                                                  uint8_t const * const p_sr_data, uint8_t srdlen));\n",
        );
        let ctx = context(std::slice::from_ref(&header));
        let mut diags = Diagnostics::default();
        let records = extract(&header, &ctx, &Dialect::default(), &mut diags);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].syscall_number, "0x7c");
        assert_eq!(
            records[0].argument_list,
            [
                "uint8_t const * const p_data",
                "uint8_t dlen",
                "uint8_t const * const p_sr_data",
                "uint8_t srdlen"
            ]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn test_macro_definition_template_ignored() {
        let header = SourceFile::new(
            "nrf_svc.h",
            "#define SVCALL(number, return_type, signature) return_type __svc(number) signature\n",
        );
        let ctx = context(std::slice::from_ref(&header));
        let mut diags = Diagnostics::default();
        assert!(extract(&header, &ctx, &Dialect::default(), &mut diags).is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_unbound_symbol_dropped() {
        let header = SourceFile::new("a.h", "SVCALL(SD_UNKNOWN, uint32_t, sd_unknown(void));\n");
        let ctx = context(std::slice::from_ref(&header));
        let mut diags = Diagnostics::default();
        assert!(extract(&header, &ctx, &Dialect::default(), &mut diags).is_empty());
        assert!(matches!(
            diags.into_vec()[..],
            [Diagnostic::UnresolvedSymbol { .. }]
        ));
    }

    #[test]
    fn test_unterminated_call_reported() {
        let header = SourceFile::new("a.h", "SVCALL(SD_X, uint32_t, sd_x(uint8_t a,\n");
        let ctx = context(std::slice::from_ref(&header));
        let mut diags = Diagnostics::default();
        assert!(extract(&header, &ctx, &Dialect::default(), &mut diags).is_empty());
        assert_eq!(diags.len(), 1);
    }
}
