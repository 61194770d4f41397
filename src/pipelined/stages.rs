//! 5 stages adapted for piplined execution.
//! Each stage reads the current pipeline registers and writes only
//! the next copy of the register right after it.

use super::pipeline::EXMEMRegister;
use super::pipeline::IDEXRegister;
use super::pipeline::IFIDRegister;
use super::pipeline::MEMWBRegister;
use super::pipeline::PipelineState;
use super::pipeline::Stage;
use super::pipeline::StageMask;
use super::trace::CycleTrace;
use crate::alu;
use crate::alu::ALUSrc;
use crate::cpu::CPUState;
use crate::cpu::SENTINEL_ADDRESS;
use crate::error::MemoryError;
use crate::error::MemoryErrorKind;
use crate::error::SimulatorResult;
use crate::instruction::Controls;
use crate::instruction::Function;
use crate::instruction::Instruction;
use crate::instruction::RegDst;
use crate::memory::StorageInterface;

/// Register write performed by WB
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Commit {
    pub register: u32,
    pub value: u32,
}

/// Control-flow outcome known once a branch or jump reaches MEM
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    None,
    Branch {
        /// Address of the branch itself
        pc: u32,
        taken: bool,
        /// Architecturally correct next PC
        target: u32,
    },
    Jump {
        pc: u32,
        target: u32,
    },
}

/// WB, run before ID so that decode reads values written this cycle
pub fn write_back_early(
    cpu: &mut CPUState,
    current_state: &PipelineState,
    bubbles: &StageMask,
) -> SimulatorResult<Option<Commit>> {
    let mem_wb = &current_state.mem_wb;
    if bubbles.is_set(Stage::WriteBack) || !mem_wb.controls.reg_write {
        return Ok(None);
    }

    let commit =
        Commit { register: mem_wb.write_target, value: mem_wb.write_back_value() };
    cpu.gpr.write(commit.register, commit.value)?;
    Ok(Some(commit))
}

/// IF stage. Returns the fetched instruction, if any.
pub fn instruction_fetch(
    cpu: &mut CPUState,
    mem: &impl StorageInterface,
    next_if_id: &mut IFIDRegister,
    bubbles: &mut StageMask,
    trace: &mut CycleTrace,
) -> SimulatorResult<Option<Instruction>> {
    let pc = cpu.pc.read();

    if bubbles.is_set(Stage::Fetch) {
        // Hold both the PC and IF/ID
        bubbles.clear(Stage::Fetch);
        trace.stage(Stage::Fetch, format!("stalled, holding PC {:#010x}", pc));
        return Ok(None);
    }

    if pc == SENTINEL_ADDRESS {
        *next_if_id = IFIDRegister::default();
        trace.stage(Stage::Fetch, "no more instructions to fetch");
        return Ok(None);
    }

    let next_pc = pc.wrapping_add(4);
    cpu.pc.write(next_pc);

    // Wrong-path fetches may leave memory; the fault only counts if the
    // slot is still alive when it reaches MEM
    let raw_inst = match mem.fetch(pc) {
        Ok(raw_inst) => raw_inst,
        Err(e) => {
            *next_if_id = IFIDRegister {
                pc: next_pc,
                fetch_fault: Some(pc),
                ..Default::default()
            };
            trace.stage(Stage::Fetch, format!("{:#010x}: {}", pc, e));
            return Ok(None);
        }
    };

    let inst = Instruction::new(raw_inst);
    *next_if_id = IFIDRegister::fetched(next_pc, raw_inst);
    trace.stage(Stage::Fetch, format!("{:#010x}: {:#010x} {}", pc, raw_inst, inst));

    Ok(Some(inst))
}

/// ID stage
pub fn instruction_decode(
    cpu: &mut CPUState,
    current_state: &PipelineState,
    next_id_ex: &mut IDEXRegister,
    bubbles: &StageMask,
    trace: &mut CycleTrace,
) {
    let if_id = &current_state.if_id;
    if bubbles.is_set(Stage::Decode) {
        *next_id_ex = IDEXRegister::default();
        trace.stage(Stage::Decode, "[BUBBLE]");
        return;
    }

    if let Some(address) = if_id.fetch_fault {
        *next_id_ex = IDEXRegister { fetch_fault: Some(address), ..Default::default() };
        trace.stage(Stage::Decode, format!("fetch fault at {:#010x}", address));
        return;
    }

    if !if_id.valid {
        *next_id_ex = IDEXRegister::default();
        trace.stage(Stage::Decode, "[BUBBLE]");
        return;
    }

    let inst = Instruction::new(if_id.raw_inst);
    let attributes = inst.attributes;

    *next_id_ex = IDEXRegister {
        pc: if_id.pc,
        inst,
        controls: inst.controls,
        read_data_1: cpu.gpr.read(attributes.rs),
        read_data_2: cpu.gpr.read(attributes.rt),
        fetch_fault: None,
    };
    cpu.history.record_format(inst.format);

    trace.stage(
        Stage::Decode,
        format!(
            "{} ({:?}-type) rs: r[{}]={:#x}, rt: r[{}]={:#x}, rd: {}, imm: {:#x}",
            inst,
            inst.format,
            attributes.rs,
            next_id_ex.read_data_1,
            attributes.rt,
            next_id_ex.read_data_2,
            attributes.rd,
            attributes.imm
        ),
    );
}

/// EX stage
pub fn execute(
    cpu: &CPUState,
    current_state: &PipelineState,
    next_ex_mem: &mut EXMEMRegister,
    bubbles: &StageMask,
    trace: &mut CycleTrace,
) -> SimulatorResult<()> {
    let id_ex = &current_state.id_ex;
    let controls = id_ex.controls;
    if bubbles.is_set(Stage::Execute) {
        *next_ex_mem = EXMEMRegister::default();
        trace.stage(Stage::Execute, "[BUBBLE]");
        return Ok(());
    }

    if let Some(address) = id_ex.fetch_fault {
        *next_ex_mem = EXMEMRegister { fetch_fault: Some(address), ..Default::default() };
        trace.stage(Stage::Execute, format!("fetch fault at {:#010x}", address));
        return Ok(());
    }

    if controls == Controls::default() {
        *next_ex_mem = EXMEMRegister::default();
        trace.stage(Stage::Execute, "[BUBBLE]");
        return Ok(());
    }

    let inst = id_ex.inst;
    let attributes = inst.attributes;

    let op2 = match controls.alu_src {
        ALUSrc::REG => id_ex.read_data_2,
        ALUSrc::IMM => attributes.imm,
    };
    let control = alu::alu_control(controls.alu_op, &inst)?;
    // A mult now in MEM has not committed hi/lo yet
    let accumulator = current_state.ex_mem.accumulator.unwrap_or(cpu.accumulator);
    let output = alu::alu(control, &inst, id_ex.read_data_1, op2, accumulator);

    let alu_result = match controls.reg_dst {
        // jal links the following instruction
        RegDst::Ra => id_ex.pc,
        _ => output.result,
    };
    let jump_target = match inst.function {
        Function::JR => id_ex.read_data_1,
        _ => (id_ex.pc & 0xf000_0000) | (attributes.target << 2),
    };

    *next_ex_mem = EXMEMRegister {
        pc: id_ex.pc,
        inst,
        controls,
        branch_target: id_ex.pc.wrapping_add(attributes.imm << 2),
        jump_target,
        zero: output.zero,
        alu_result,
        read_data_2: id_ex.read_data_2,
        write_target: controls.reg_dst.select(&attributes),
        accumulator: output.accumulator,
        fetch_fault: None,
    };

    trace.stage(
        Stage::Execute,
        format!(
            "{} ALU {:?}: {:#x}, {:#x} -> {:#x}{}",
            inst,
            control,
            id_ex.read_data_1,
            op2,
            alu_result,
            if controls.branch {
                format!(", zero: {}, target: {:#010x}", output.zero, next_ex_mem.branch_target)
            } else {
                String::new()
            }
        ),
    );

    Ok(())
}

/// MEM stage. Performs the load or store and reports how a branch or
/// jump resolved; the caller validates and redirects.
/// A faulted fetch that survived to this point is fatal.
pub fn memory_access(
    cpu: &mut CPUState,
    mem: &mut impl StorageInterface,
    current_state: &PipelineState,
    next_mem_wb: &mut MEMWBRegister,
    bubbles: &StageMask,
    trace: &mut CycleTrace,
) -> SimulatorResult<Resolution> {
    let ex_mem = &current_state.ex_mem;
    let controls = ex_mem.controls;
    if !bubbles.is_set(Stage::Memory) {
        if let Some(address) = ex_mem.fetch_fault {
            return Err(MemoryError::AccessError {
                address,
                kind: MemoryErrorKind::FetchOutOfBounds,
            }
            .into());
        }
    }

    if bubbles.is_set(Stage::Memory) || controls == Controls::default() {
        *next_mem_wb = MEMWBRegister::default();
        trace.stage(Stage::Memory, "[BUBBLE]");
        return Ok(Resolution::None);
    }

    let address = ex_mem.alu_result;
    let mut read_data = 0;

    if controls.mem_write {
        mem.set32(address, ex_mem.read_data_2)?;
        cpu.history.mem_access_count += 1;
        trace.stage(
            Stage::Memory,
            format!("M[{:#010x}] <- {:#x}", address, ex_mem.read_data_2),
        );
    }

    if controls.mem_read {
        read_data = mem.get32(address)?;
        cpu.history.mem_access_count += 1;
        trace.stage(Stage::Memory, format!("M[{:#010x}] -> {:#x}", address, read_data));
    }

    if let Some(accumulator) = ex_mem.accumulator {
        cpu.accumulator = accumulator;
        trace.stage(
            Stage::Memory,
            format!("hi <- {:#x}, lo <- {:#x}", accumulator.hi, accumulator.lo),
        );
    }

    *next_mem_wb = MEMWBRegister {
        pc: ex_mem.pc,
        inst: ex_mem.inst,
        controls,
        read_data,
        alu_result: ex_mem.alu_result,
        write_target: ex_mem.write_target,
    };

    let own_pc = ex_mem.pc.wrapping_sub(4);
    let resolution = if controls.jump {
        Resolution::Jump { pc: own_pc, target: ex_mem.jump_target }
    } else if controls.branch {
        Resolution::Branch {
            pc: own_pc,
            taken: ex_mem.zero,
            target: if ex_mem.zero { ex_mem.branch_target } else { ex_mem.pc },
        }
    } else {
        Resolution::None
    };

    if !matches!(resolution, Resolution::None) || !(controls.mem_read || controls.mem_write) {
        trace.stage(Stage::Memory, format!("{}", ex_mem.inst));
    }

    Ok(resolution)
}

/// WB stage. The register file was already written by
/// `write_back_early`; this only reports the commit.
pub fn write_back(
    commit: Option<Commit>,
    current_state: &PipelineState,
    bubbles: &StageMask,
    trace: &mut CycleTrace,
) {
    let mem_wb = &current_state.mem_wb;
    if bubbles.is_set(Stage::WriteBack) || mem_wb.controls == Controls::default() {
        trace.stage(Stage::WriteBack, "[BUBBLE]");
        return;
    }

    match commit {
        Some(Commit { register, value }) if register != 0 => trace.stage(
            Stage::WriteBack,
            format!("{} r[{}] <- {:#x}", mem_wb.inst, register, value),
        ),
        _ => trace.stage(Stage::WriteBack, format!("{}", mem_wb.inst)),
    }
}
