//! Command handlers behind the clap surface.
//!
//! Mutating commands hold the provider's lock for their whole body; `list`
//! and `status` stay lock-free so they never block on a switch in progress.
//! Every command that acts on "who is active" reconciles the roster pointer
//! against the provider's real login first.

use std::path::Path;

use anyhow::{bail, Context, Result};

use caflip_core::{acquire_lock, LockGuard, LockOptions};
use caflip_provider::{backend_for, AccountBackend, ProviderKind, ProviderPaths};
use caflip_roster::{
    display_label, find_account_by_alias, lifecycle, resolve_email, resolve_user_identifier,
    store, AddOutcome, NewAccount, Roster,
};
use caflip_switch::{
    execute_post_removal, perform_switch, reconcile_active_account, SwitchOutcome,
};

/// Everything a handler needs for one provider-qualified invocation.
pub struct ProviderContext {
    pub kind: ProviderKind,
    pub paths: ProviderPaths,
    pub backend: Box<dyn AccountBackend>,
}

impl ProviderContext {
    pub fn new(home: &Path, kind: ProviderKind) -> Self {
        Self {
            kind,
            paths: ProviderPaths::new(home, kind),
            backend: backend_for(kind, home),
        }
    }

    fn lock(&self) -> Result<LockGuard> {
        self.paths.ensure_directories()?;
        Ok(acquire_lock(&self.paths.lock_path, LockOptions::default())?)
    }

    fn load_reconciled(&self) -> Result<Roster> {
        let mut roster = store::load(&self.paths.roster_path)?;
        reconcile_active_account(&mut roster, self.backend.as_ref(), &self.paths)?;
        Ok(roster)
    }

    fn require_roster(&self) -> Result<()> {
        if !self.paths.roster_path.exists() {
            bail!("No accounts managed yet. Run: caflip {} add", self.kind);
        }
        Ok(())
    }
}

pub fn list(ctx: &ProviderContext) -> Result<()> {
    if !ctx.paths.roster_path.exists() {
        println!("No accounts managed yet. Run: caflip {} add", ctx.kind);
        return Ok(());
    }

    let roster = ctx.load_reconciled()?;
    let current_email = ctx.backend.current_email();
    println!("Accounts:");
    for (index, id) in roster.sequence.iter().enumerate() {
        let Some(account) = roster.accounts.get(id) else {
            continue; // load() validated the sequence/accounts correspondence
        };
        let mut line = format!("  {}: {}", index + 1, account.email);
        if let Some(alias) = account.alias.as_deref() {
            line.push_str(&format!(" [{alias}]"));
        }
        if current_email.as_deref() == Some(account.email.as_str()) {
            line.push_str(" (active)");
        }
        println!("{line}");
    }
    Ok(())
}

pub fn add(ctx: &ProviderContext, alias: Option<String>) -> Result<()> {
    let _lock = ctx.lock()?;
    store::initialize(&ctx.paths.roster_path)?;

    let Some(identity) = ctx.backend.current_identity() else {
        bail!(
            "No active {} account found. Please log in first.",
            ctx.kind.label()
        );
    };
    let mut roster = ctx.load_reconciled()?;

    let outcome = lifecycle::add(
        &mut roster,
        NewAccount {
            email: identity.email.clone(),
            uuid: identity.account_id,
            alias: alias.clone(),
        },
    )?;
    let id = match outcome {
        AddOutcome::AlreadyManaged(_) => {
            println!("Account {} is already managed.", identity.email);
            return Ok(());
        }
        AddOutcome::Added(id) => id,
    };

    // Back up the live credentials (and config, for providers that keep one)
    // under the new id before the roster records the account.
    let raw = ctx
        .backend
        .read_active_auth()?
        .context("no credentials found for the current account")?;
    ctx.backend
        .write_account_auth(id, &identity.email, &raw, &ctx.paths.credentials_dir)?;
    if let Some(config) = ctx.backend.read_live_config()? {
        ctx.backend
            .write_account_config(id, &identity.email, &config, &ctx.paths.configs_dir)?;
    }
    store::persist(&ctx.paths.roster_path, &mut roster)?;

    let alias_str = alias.map(|alias| format!(" [{alias}]")).unwrap_or_default();
    println!(
        "Added {}: {}{alias_str}",
        display_label(&roster, id),
        identity.email
    );
    Ok(())
}

pub fn remove(ctx: &ProviderContext, identifier: &str) -> Result<()> {
    ctx.require_roster()?;
    let _lock = ctx.lock()?;
    let mut roster = ctx.load_reconciled()?;

    let id = resolve_user_identifier(&roster, identifier)?;
    let label = display_label(&roster, id);
    let email = roster
        .accounts
        .get(&id)
        .map(|account| account.email.clone())
        .unwrap_or_default();
    if roster.active_account_number == Some(id) {
        println!("Warning: {label} ({email}) is currently active");
    }

    let action = lifecycle::remove(&mut roster, id)?;
    let outcome = execute_post_removal(&mut roster, action, ctx.backend.as_ref(), &ctx.paths)?;
    if let Some(outcome) = outcome {
        report_switch(ctx, &roster, outcome);
    }

    // The roster no longer references the account; its backups go last so a
    // failed removal never strands an account without restorable state.
    ctx.backend
        .delete_account_auth(id, &email, &ctx.paths.credentials_dir)?;
    ctx.backend
        .delete_account_config(id, &email, &ctx.paths.configs_dir)?;

    println!("{label} ({email}) has been removed");
    Ok(())
}

pub fn next(ctx: &ProviderContext) -> Result<()> {
    ctx.require_roster()?;
    let _lock = ctx.lock()?;
    let mut roster = ctx.load_reconciled()?;

    let target = lifecycle::next_in_sequence(&roster)?;
    let outcome = perform_switch(&mut roster, target, ctx.backend.as_ref(), &ctx.paths)?;
    report_switch(ctx, &roster, outcome);
    Ok(())
}

pub fn switch_by_alias(ctx: &ProviderContext, token: &str) -> Result<()> {
    ctx.require_roster()?;
    let _lock = ctx.lock()?;
    let mut roster = ctx.load_reconciled()?;

    let Some(target) = find_account_by_alias(&roster, token) else {
        bail!("unknown command or alias \"{token}\"");
    };
    let outcome = perform_switch(&mut roster, target, ctx.backend.as_ref(), &ctx.paths)?;
    report_switch(ctx, &roster, outcome);
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub struct StatusReport {
    pub email: Option<String>,
    pub alias: Option<String>,
    pub managed: bool,
}

/// Current login as the provider reports it, cross-referenced with the
/// roster. Read-only: no lock, no reconciliation write.
pub fn status_report(ctx: &ProviderContext) -> Result<StatusReport> {
    let email = ctx.backend.current_email();
    let roster = store::load(&ctx.paths.roster_path)?;
    let managed_id = email
        .as_deref()
        .and_then(|email| resolve_email(&roster, email));
    let alias = managed_id
        .and_then(|id| roster.accounts.get(&id))
        .and_then(|account| account.alias.clone());
    Ok(StatusReport {
        email,
        alias,
        managed: managed_id.is_some(),
    })
}

pub fn status(ctx: &ProviderContext, json: bool) -> Result<()> {
    let report = status_report(ctx)?;
    if json {
        let payload = serde_json::json!({
            "provider": ctx.kind.as_str(),
            "email": report.email,
            "alias": report.alias,
            "managed": report.managed,
        });
        println!("{payload}");
        return Ok(());
    }

    match report.email {
        None => println!("none"),
        Some(email) => match report.alias {
            Some(alias) => println!("{email} [{alias}]"),
            None => println!("{email}"),
        },
    }
    Ok(())
}

pub fn set_alias(ctx: &ProviderContext, name: &str, identifier: Option<&str>) -> Result<()> {
    ctx.require_roster()?;
    let _lock = ctx.lock()?;
    let mut roster = ctx.load_reconciled()?;

    let id = match identifier {
        Some(token) => resolve_user_identifier(&roster, token)?,
        None => {
            let Some(email) = ctx.backend.current_email() else {
                bail!(
                    "No active {} account found. Please log in first.",
                    ctx.kind.label()
                );
            };
            resolve_email(&roster, &email)
                .with_context(|| format!("current account is not managed: {email}"))?
        }
    };
    lifecycle::set_alias(&mut roster, id, name)?;
    store::persist(&ctx.paths.roster_path, &mut roster)?;

    let email = roster
        .accounts
        .get(&id)
        .map(|account| account.email.clone())
        .unwrap_or_default();
    println!("Alias \"{name}\" set for {} ({email})", display_label(&roster, id));
    Ok(())
}

fn report_switch(ctx: &ProviderContext, roster: &Roster, outcome: SwitchOutcome) {
    let id = match outcome {
        SwitchOutcome::AlreadyActive(id) | SwitchOutcome::Switched(id) => id,
    };
    let label = display_label(roster, id);
    let (email, alias) = roster
        .accounts
        .get(&id)
        .map(|account| (account.email.clone(), account.alias.clone()))
        .unwrap_or_default();
    let alias_str = alias.map(|alias| format!(" [{alias}]")).unwrap_or_default();
    match outcome {
        SwitchOutcome::AlreadyActive(_) => println!("Already using {label} ({email}){alias_str}"),
        SwitchOutcome::Switched(_) => {
            println!("Switched to {label} ({email}){alias_str}");
            println!();
            println!(
                "Please restart {} to use the new authentication.",
                ctx.kind.label()
            );
        }
    }
}
