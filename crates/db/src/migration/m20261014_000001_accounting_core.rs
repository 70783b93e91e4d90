//! Accounting core schema.
//!
//! Creates the enums, chart of accounts, journal, cost center and budget
//! tables. Structural invariants that must hold under concurrent writers
//! are enforced here as constraints.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(CHART_OF_ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 3: COST CENTERS
        // ============================================================
        db.execute_unprepared(COST_CENTERS_SQL).await?;
        db.execute_unprepared(COST_ALLOCATIONS_SQL).await?;

        // ============================================================
        // PART 4: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRY_LINES_SQL).await?;

        // ============================================================
        // PART 5: BUDGETS
        // ============================================================
        db.execute_unprepared(PROJECT_BUDGETS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE account_type AS ENUM ('ASSET', 'LIABILITY', 'EQUITY', 'REVENUE', 'EXPENSE');

CREATE TYPE normal_balance AS ENUM ('DEBIT', 'CREDIT');

CREATE TYPE entry_status AS ENUM ('DRAFT', 'POSTED', 'REVERSED');

CREATE TYPE cost_center_type AS ENUM (
    'ADMINISTRATIVE',
    'OPERATIONAL',
    'PROJECT_SPECIFIC',
    'EQUIPMENT',
    'MATERIAL_PROCUREMENT',
    'LABOR_MANAGEMENT',
    'QUALITY_CONTROL',
    'SAFETY_COMPLIANCE',
    'OVERHEAD'
);

CREATE TYPE allocation_type AS ENUM (
    'DIRECT_LABOR',
    'DIRECT_MATERIAL',
    'EQUIPMENT_USAGE',
    'OVERHEAD_ALLOCATION',
    'ADMINISTRATIVE_COSTS',
    'UTILITY_COSTS',
    'INSURANCE_ALLOCATION',
    'FACILITY_COSTS'
);
";

const CHART_OF_ACCOUNTS_SQL: &str = r"
CREATE TABLE chart_of_accounts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code VARCHAR(20) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    account_type account_type NOT NULL,
    sub_type VARCHAR(50),
    level SMALLINT NOT NULL,
    parent_id UUID REFERENCES chart_of_accounts(id) ON DELETE RESTRICT,
    normal_balance normal_balance NOT NULL,
    is_control_account BOOLEAN NOT NULL DEFAULT false,
    is_active BOOLEAN NOT NULL DEFAULT true,
    current_balance NUMERIC(19, 2) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_coa_level CHECK (level BETWEEN 1 AND 4),
    CONSTRAINT chk_coa_parent_iff_nested CHECK ((level = 1) = (parent_id IS NULL))
);

CREATE INDEX idx_coa_type_level ON chart_of_accounts(account_type, level);
CREATE INDEX idx_coa_parent ON chart_of_accounts(parent_id) WHERE parent_id IS NOT NULL;
CREATE INDEX idx_coa_active ON chart_of_accounts(code) WHERE is_active = true;
";

const COST_CENTERS_SQL: &str = r"
CREATE TABLE cost_centers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    code VARCHAR(30) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    cost_center_type cost_center_type NOT NULL,
    project_id UUID,
    subsidiary_id UUID,
    budget_limit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_cc_budget_limit CHECK (budget_limit >= 0)
);

CREATE INDEX idx_cc_project ON cost_centers(project_id) WHERE project_id IS NOT NULL;
";

const COST_ALLOCATIONS_SQL: &str = r"
CREATE TABLE cost_allocations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    cost_center_id UUID NOT NULL REFERENCES cost_centers(id) ON DELETE RESTRICT,
    project_id UUID NOT NULL,
    amount NUMERIC(19, 2) NOT NULL,
    allocation_type allocation_type NOT NULL,
    allocation_basis TEXT NOT NULL,
    effective_date DATE NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_alloc_amount CHECK (amount > 0)
);

CREATE INDEX idx_alloc_center_date ON cost_allocations(cost_center_id, effective_date);
CREATE INDEX idx_alloc_project_date ON cost_allocations(project_id, effective_date);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    entry_number VARCHAR(30) NOT NULL UNIQUE,
    entry_date DATE NOT NULL,
    description TEXT NOT NULL,
    status entry_status NOT NULL DEFAULT 'DRAFT',
    total_debit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    total_credit NUMERIC(19, 2) NOT NULL DEFAULT 0,
    project_id UUID,
    subsidiary_id UUID,
    created_by UUID,
    posted_at TIMESTAMPTZ,
    posted_by UUID,
    reversal_of_entry_id UUID REFERENCES journal_entries(id) ON DELETE RESTRICT,
    reversed_by_entry_id UUID REFERENCES journal_entries(id) ON DELETE RESTRICT,
    reversal_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_je_balanced CHECK (total_debit = total_credit),
    CONSTRAINT chk_je_posted_at CHECK (status = 'DRAFT' OR posted_at IS NOT NULL),
    CONSTRAINT chk_je_reversed_link CHECK (status <> 'REVERSED' OR reversed_by_entry_id IS NOT NULL)
);

CREATE UNIQUE INDEX idx_je_single_reversal ON journal_entries(reversal_of_entry_id)
    WHERE reversal_of_entry_id IS NOT NULL;
CREATE INDEX idx_je_status_date ON journal_entries(status, entry_date);
CREATE INDEX idx_je_project ON journal_entries(project_id) WHERE project_id IS NOT NULL;
CREATE INDEX idx_je_subsidiary ON journal_entries(subsidiary_id) WHERE subsidiary_id IS NOT NULL;
";

const JOURNAL_ENTRY_LINES_SQL: &str = r"
CREATE TABLE journal_entry_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    journal_entry_id UUID NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
    account_id UUID NOT NULL REFERENCES chart_of_accounts(id) ON DELETE RESTRICT,
    line_number INTEGER NOT NULL,
    debit_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    credit_amount NUMERIC(19, 2) NOT NULL DEFAULT 0,
    description TEXT,
    project_id UUID,
    cost_center_id UUID REFERENCES cost_centers(id) ON DELETE RESTRICT,
    tax_amount NUMERIC(19, 2),
    tax_type VARCHAR(30),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_jel_debit_xor_credit CHECK (
        (debit_amount > 0 AND credit_amount = 0) OR (debit_amount = 0 AND credit_amount > 0)
    ),
    CONSTRAINT chk_jel_line_number CHECK (line_number > 0),
    CONSTRAINT chk_jel_tax_amount CHECK (tax_amount IS NULL OR tax_amount >= 0),
    UNIQUE (journal_entry_id, line_number)
);

CREATE INDEX idx_jel_account ON journal_entry_lines(account_id);
CREATE INDEX idx_jel_project ON journal_entry_lines(project_id) WHERE project_id IS NOT NULL;
CREATE INDEX idx_jel_cost_center ON journal_entry_lines(cost_center_id) WHERE cost_center_id IS NOT NULL;
";

const PROJECT_BUDGETS_SQL: &str = r"
CREATE TABLE project_budgets (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    project_id UUID NOT NULL,
    subsidiary_id UUID,
    period_start DATE NOT NULL,
    period_end DATE NOT NULL,
    revision_number INTEGER NOT NULL DEFAULT 1,
    total_budget NUMERIC(19, 2) NOT NULL,
    categories JSONB NOT NULL,
    approval_required BOOLEAN NOT NULL DEFAULT false,
    created_by UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_pb_period CHECK (period_start <= period_end),
    CONSTRAINT chk_pb_total CHECK (total_budget > 0),
    CONSTRAINT chk_pb_revision CHECK (revision_number > 0),
    UNIQUE (project_id, period_start, period_end, revision_number)
);

CREATE INDEX idx_pb_project ON project_budgets(project_id, period_start, period_end);
CREATE INDEX idx_pb_subsidiary ON project_budgets(subsidiary_id) WHERE subsidiary_id IS NOT NULL;
";

const TRIGGERS_SQL: &str = r"
-- Lines of a non-draft entry are frozen
CREATE OR REPLACE FUNCTION prevent_posted_line_modification()
RETURNS TRIGGER AS $$
DECLARE
    v_status entry_status;
BEGIN
    SELECT status INTO v_status
    FROM journal_entries
    WHERE id = COALESCE(NEW.journal_entry_id, OLD.journal_entry_id);

    IF v_status IS NOT NULL AND v_status <> 'DRAFT' THEN
        RAISE EXCEPTION 'Lines of a % journal entry cannot be modified', v_status;
    END IF;

    RETURN COALESCE(NEW, OLD);
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_posted_line_mod
BEFORE INSERT OR UPDATE OR DELETE ON journal_entry_lines
FOR EACH ROW EXECUTE FUNCTION prevent_posted_line_modification();

-- Allocations are append-only
CREATE OR REPLACE FUNCTION prevent_allocation_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Cost allocations are append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_allocation_mod
BEFORE UPDATE OR DELETE ON cost_allocations
FOR EACH ROW EXECUTE FUNCTION prevent_allocation_modification();

-- Budget revisions are append-only
CREATE TRIGGER trg_prevent_budget_mod
BEFORE UPDATE OR DELETE ON project_budgets
FOR EACH ROW EXECUTE FUNCTION prevent_allocation_modification();
";

const DROP_ALL_SQL: &str = r"
-- Drop triggers
DROP TRIGGER IF EXISTS trg_prevent_budget_mod ON project_budgets;
DROP TRIGGER IF EXISTS trg_prevent_allocation_mod ON cost_allocations;
DROP TRIGGER IF EXISTS trg_prevent_posted_line_mod ON journal_entry_lines;

-- Drop functions
DROP FUNCTION IF EXISTS prevent_allocation_modification();
DROP FUNCTION IF EXISTS prevent_posted_line_modification();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS project_budgets CASCADE;
DROP TABLE IF EXISTS journal_entry_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS cost_allocations CASCADE;
DROP TABLE IF EXISTS cost_centers CASCADE;
DROP TABLE IF EXISTS chart_of_accounts CASCADE;

-- Drop enums
DROP TYPE IF EXISTS allocation_type CASCADE;
DROP TYPE IF EXISTS cost_center_type CASCADE;
DROP TYPE IF EXISTS entry_status CASCADE;
DROP TYPE IF EXISTS normal_balance CASCADE;
DROP TYPE IF EXISTS account_type CASCADE;
";
