//! Dialog procedure discovery.
//!
//! Every `user32.dll` dialog constructor takes the dialog procedure as its fourth argument. For
//! each call site of those APIs the calling routine is lifted and the operand pushed for that
//! argument is read back; with stdcall the push nearest to the call is argument 0.

use crate::{
    analysis::host::{Host, IlOp, Operand},
    directories::ImportTable,
};

/// Module exporting the dialog APIs.
pub const DIALOG_MODULE: &str = "user32.dll";

/// Dialog APIs and the argument index of their dialog procedure.
pub const DIALOG_APIS: [(&str, usize); 12] = [
    ("DialogBoxA", 3),
    ("DialogBoxW", 3),
    ("DialogBoxParamA", 3),
    ("DialogBoxParamW", 3),
    ("DialogBoxIndirectParamA", 3),
    ("DialogBoxIndirectParamW", 3),
    ("CreateDialogA", 3),
    ("CreateDialogW", 3),
    ("CreateDialogParamA", 3),
    ("CreateDialogParamW", 3),
    ("CreateDialogIndirectParamA", 3),
    ("CreateDialogIndirectParamW", 3),
];

/// Resolve the address calls to `symbol` of [`DIALOG_MODULE`] target.
///
/// The host's symbol database is asked for `_user32.dll.<symbol>` and then `user32.dll.<symbol>`;
/// failing both, the decoded IAT cell is used.
#[must_use]
pub fn resolve_api(host: &dyn Host, imports: &ImportTable, symbol: &str) -> Option<u64> {
    let import = imports.find(DIALOG_MODULE, symbol);
    let name = match import {
        Some(import) => import.full_name(),
        None => format!("{DIALOG_MODULE}.{symbol}"),
    };

    host.address_of(&format!("_{name}"))
        .or_else(|| host.address_of(&name))
        .or(import.map(|import| import.iat_address))
}

/// The push site and operand of argument `argument` for the call at `call_site`.
fn pushed_argument(host: &dyn Host, call_site: u64, argument: usize) -> Option<(u64, Operand)> {
    let routine = host.lift(call_site)?;
    let call = routine
        .iter()
        .position(|insn| insn.address == call_site && matches!(insn.op, IlOp::Call(_)))?;

    // Pushes before an earlier call belong to that call.
    routine[..call]
        .iter()
        .rev()
        .take_while(|insn| !matches!(insn.op, IlOp::Call(_)))
        .filter_map(|insn| match insn.op {
            IlOp::Push(operand) => Some((insn.address, operand)),
            IlOp::Call(_) | IlOp::Other => None,
        })
        .nth(argument)
}

/// Find, mark and cross-reference every dialog procedure passed to a dialog API.
///
/// Returns the procedures in discovery order, without duplicates.
pub fn find_dialog_procedures(host: &mut dyn Host, imports: &ImportTable) -> Vec<u64> {
    let mut procedures = Vec::new();

    for (symbol, argument) in DIALOG_APIS {
        let Some(api) = resolve_api(host, imports, symbol) else {
            continue;
        };

        for reference in host.references_to(api) {
            let Some((push_site, operand)) = pushed_argument(host, reference.from, argument) else {
                log::debug!(
                    "{symbol} call at 0x{:X}: dialog procedure argument not found",
                    reference.from
                );
                continue;
            };

            let Some(procedure) = operand.address() else {
                continue;
            };

            log::trace!("{symbol} at 0x{:X} registers 0x{procedure:X}", reference.from);
            host.mark_function(procedure, Some(&format!("DlgProc_{procedure:X}")), true);
            host.add_reference(push_site, procedure);

            if !procedures.contains(&procedure) {
                procedures.push(procedure);
            }
        }
    }

    procedures
}
