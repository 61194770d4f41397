//! Pipelined implementation

use tracing::info;

use crate::cpu::CPUHistory;
use crate::cpu::CPUState;
use crate::cpu::SENTINEL_ADDRESS;
use crate::error::ExecutionError;
use crate::error::SimulatorError;
use crate::error::SimulatorResult;
use crate::instruction::Instruction;
use crate::memory::StorageInterface;
use crate::pipelined::branch_predictor::BranchPredictor;
use crate::pipelined::branch_predictor::PredictionOutcome;
use crate::pipelined::hazard::HazardPolicy;
use crate::pipelined::pipeline::PipelineState;
use crate::pipelined::pipeline::Stage;
use crate::pipelined::pipeline::StageMask;
use crate::pipelined::stages::Resolution;
use crate::pipelined::trace::CycleTrace;

pub mod branch_predictor;
pub mod hazard;
pub mod pipeline;
pub mod stages;
pub mod trace;

/// A 5-stage pipeline driving a CPU and its memory
pub struct Pipeline<M: StorageInterface> {
    pub cpu: CPUState,
    pub mem: M,

    current_state: PipelineState,
    next_state: PipelineState,

    branch_predictor: BranchPredictor,
    /// Stages handling a bubble this cycle
    bubbles: StageMask,
    /// Position of the terminal jump once it has resolved
    drain: StageMask,
}

impl<M: StorageInterface> Pipeline<M> {
    pub fn new(cpu: CPUState, mem: M) -> Self {
        let branch_predictor = BranchPredictor::new(cpu.policy.heuristic);
        Self {
            cpu,
            mem,
            current_state: PipelineState::default(),
            next_state: PipelineState::default(),
            branch_predictor,
            bubbles: StageMask::default(),
            drain: StageMask::default(),
        }
    }

    /// Whether the terminal jump has left the pipeline
    pub fn is_finished(&self) -> bool {
        self.drain.drained()
    }

    /// Runs cycles until the terminal jump has drained.
    /// `on_cycle` sees the trace of every completed cycle.
    pub fn run(
        &mut self,
        mut on_cycle: impl FnMut(&CycleTrace),
    ) -> SimulatorResult<CPUHistory> {
        info!(
            "running with {} hazard policy, {} branch predictor",
            self.cpu.policy.hazard, self.cpu.policy.heuristic
        );

        while !self.is_finished() {
            let cycle = self.cpu.history.cycle_count + 1;
            let trace = self.step().map_err(|e| SimulatorError::CycleFailed {
                cycle,
                source: Box::new(e),
            })?;
            on_cycle(&trace);
        }

        info!(
            "finished after {} cycles, {} predictions outstanding",
            self.cpu.history.cycle_count,
            self.branch_predictor.outstanding()
        );
        Ok(self.cpu.history)
    }

    /// Executes one clock cycle
    pub fn step(&mut self) -> SimulatorResult<CycleTrace> {
        let max_cycles = self.cpu.policy.max_cycles;
        if self.cpu.history.cycle_count >= max_cycles {
            return Err(ExecutionError::ExecutionLimitReached(max_cycles).into());
        }

        let mut trace =
            CycleTrace::new(self.cpu.history.cycle_count + 1, self.cpu.pc.read());

        // Every register not written this cycle keeps its value
        self.next_state = self.current_state;

        // Peek at what is in flight before anything moves
        let stall = match self.cpu.policy.hazard {
            HazardPolicy::Stall => hazard::detect_stall(&self.current_state),
            HazardPolicy::Forward => None,
        };
        if let Some(cause) = stall {
            self.bubbles.set(Stage::Fetch);
            self.bubbles.set(Stage::Decode);
            trace.note(
                "STALL",
                format!("r[{}] still in {}", cause.register, cause.producer),
            );
        }

        let commit = stages::write_back_early(
            &mut self.cpu,
            &self.current_state,
            &self.bubbles,
        )?;

        let fetched = stages::instruction_fetch(
            &mut self.cpu,
            &self.mem,
            &mut self.next_state.if_id,
            &mut self.bubbles,
            &mut trace,
        )?;
        stages::instruction_decode(
            &mut self.cpu,
            &self.current_state,
            &mut self.next_state.id_ex,
            &self.bubbles,
            &mut trace,
        );
        stages::execute(
            &self.cpu,
            &self.current_state,
            &mut self.next_state.ex_mem,
            &self.bubbles,
            &mut trace,
        )?;
        let resolution = stages::memory_access(
            &mut self.cpu,
            &mut self.mem,
            &self.current_state,
            &mut self.next_state.mem_wb,
            &self.bubbles,
            &mut trace,
        )?;
        let redirected = self.resolve(resolution, &mut trace)?;
        // A redirect squashes the stalled consumer along with its bubble
        if stall.is_some() && !redirected {
            self.cpu.history.stall_count += 1;
        }
        stages::write_back(commit, &self.current_state, &self.bubbles, &mut trace);

        if self.cpu.policy.hazard == HazardPolicy::Forward {
            for forwarding in hazard::forward(&mut self.next_state) {
                self.cpu.history.forward_count += 1;
                trace.note("Forwarding", forwarding);
            }
        }

        // A fetch squashed by a redirect gets no prediction
        if let (Some(inst), false) = (fetched, redirected) {
            self.predict(&inst, &mut trace);
        }

        self.bubbles.shift();
        self.drain.shift();
        self.current_state = self.next_state;
        self.cpu.update_cycle_count(1);

        Ok(trace)
    }

    /// Predicts a freshly fetched conditional branch
    fn predict(&mut self, inst: &Instruction, trace: &mut CycleTrace) {
        if !inst.is_conditional_branch() {
            return;
        }

        let fall_through = self.cpu.pc.read();
        let target = fall_through.wrapping_add(inst.attributes.imm << 2);
        let taken = self.branch_predictor.predict_and_record();
        if taken {
            self.cpu.pc.write(target);
        }

        trace.note(
            "Branch Prediction",
            format!(
                "{} ({}, history {}): {} -> PC {:#010x}",
                inst,
                self.branch_predictor.heuristic(),
                self.branch_predictor.history(),
                if taken { "taken" } else { "not taken" },
                self.cpu.pc.read()
            ),
        );
    }

    /// Validates a branch or applies a jump resolved in MEM.
    /// Returns whether the PC was redirected.
    fn resolve(
        &mut self,
        resolution: Resolution,
        trace: &mut CycleTrace,
    ) -> SimulatorResult<bool> {
        match resolution {
            Resolution::None => Ok(false),
            Resolution::Branch { pc, taken, target } => {
                let outcome = self
                    .branch_predictor
                    .validate(taken)
                    .ok_or(ExecutionError::OrphanBranchResolution(pc))?;

                match outcome {
                    PredictionOutcome::Hit => {
                        self.cpu.history.branch_hit_count += 1;
                        trace.note(
                            "Branch Prediction",
                            format!("hit at {:#010x}, actually {}", pc, taken_str(taken)),
                        );
                        Ok(false)
                    }
                    PredictionOutcome::Miss => {
                        self.cpu.history.branch_miss_count += 1;
                        trace.note(
                            "Branch Prediction",
                            format!("miss at {:#010x}, actually {}", pc, taken_str(taken)),
                        );
                        self.redirect(target, trace);
                        Ok(true)
                    }
                }
            }
            Resolution::Jump { pc, target } => {
                self.cpu.history.jump_count += 1;
                self.redirect(target, trace);
                if target == SENTINEL_ADDRESS {
                    self.drain.set(Stage::Memory);
                    trace.note("END", format!("return to sentinel from {:#010x}", pc));
                }
                Ok(true)
            }
        }
    }

    /// Sets the PC and squashes everything fetched after the resolved
    /// instruction
    fn redirect(&mut self, target: u32, trace: &mut CycleTrace) {
        self.cpu.pc.write(target);
        self.next_state.flush();
        self.bubbles.set(Stage::Fetch);
        self.bubbles.set(Stage::Decode);
        self.bubbles.set(Stage::Execute);
        self.branch_predictor.discard_outstanding();
        trace.note("Flush", format!("IF/ID, ID/EX, EX/MEM; PC <- {:#010x}", target));
    }
}

fn taken_str(taken: bool) -> &'static str {
    if taken {
        "taken"
    } else {
        "not taken"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CPUPolicy;
    use crate::cpu::RA;
    use crate::error::MemoryError;
    use crate::error::MemoryErrorKind;
    use crate::instruction::encode::*;
    use crate::loader;
    use crate::memory::Memory;
    use crate::pipelined::branch_predictor::PredictorHeuristic;
    use crate::pipelined::pipeline::EXMEMRegister;
    use crate::pipelined::pipeline::IDEXRegister;
    use crate::pipelined::pipeline::IFIDRegister;

    fn pipeline(program: &[u32], hazard: HazardPolicy, heuristic: PredictorHeuristic) -> Pipeline<Memory> {
        let policy = CPUPolicy { hazard, heuristic, max_cycles: 10_000, ..Default::default() };
        let mut cpu = CPUState::make(policy);
        let mut mem = Memory::make();
        loader::load_image(&mut cpu, &mut mem, &image(program)).unwrap();
        Pipeline::new(cpu, mem)
    }

    fn run(program: &[u32], hazard: HazardPolicy, heuristic: PredictorHeuristic) -> Pipeline<Memory> {
        let mut p = pipeline(program, hazard, heuristic);
        p.run(|_| {}).unwrap();
        p
    }

    #[test]
    fn test_hazard_free_cycle_count() {
        let program = [addi(8, 0, 1), addi(9, 0, 2), addi(10, 0, 3), jr(RA)];
        for hazard in [HazardPolicy::Stall, HazardPolicy::Forward] {
            let p = run(&program, hazard, PredictorHeuristic::Static);
            assert_eq!(p.cpu.history.cycle_count, program.len() as u64 + 4);
            assert_eq!(p.cpu.gpr.read(8), 1);
            assert_eq!(p.cpu.gpr.read(9), 2);
            assert_eq!(p.cpu.gpr.read(10), 3);
            assert_eq!(p.cpu.history.stall_count, 0);
            assert_eq!(p.cpu.history.jump_count, 1);
            assert!(p.is_finished());
        }
    }

    #[test]
    fn test_forwarding_adjacent_add() {
        let program = [addi(8, 0, 5), add(9, 8, 8), add(10, 9, 8), jr(RA)];
        let p = run(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(9), 10);
        assert_eq!(p.cpu.gpr.read(10), 15);
        assert_eq!(p.cpu.history.stall_count, 0);
        assert!(p.cpu.history.forward_count >= 3);
        assert_eq!(p.cpu.history.cycle_count, program.len() as u64 + 4);
    }

    #[test]
    fn test_stall_adjacent_add() {
        let program = [addi(8, 0, 5), add(9, 8, 8), jr(RA)];
        let p = run(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(9), 10);
        // the consumer waits until the producer is in WB
        assert_eq!(p.cpu.history.stall_count, 2);
        assert_eq!(p.cpu.history.cycle_count, program.len() as u64 + 4 + 2);
    }

    #[test]
    fn test_stall_distance_two() {
        let program = [addi(8, 0, 5), addi(11, 0, 1), add(9, 8, 8), jr(RA)];
        let p = run(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(9), 10);
        assert_eq!(p.cpu.history.stall_count, 1);
    }

    #[test]
    fn test_stall_covers_load_use() {
        let program = [addi(8, 0, 0x40), sw(8, 0, 8), lw(9, 0, 8), add(10, 9, 9), jr(RA)];
        let p = run(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(10), 0x80);
        assert_eq!(p.cpu.history.mem_access_count, 2);
    }

    #[test]
    fn test_forward_load_with_gap() {
        let program = [addi(8, 0, 0x40), sw(8, 0, 8), lw(9, 0, 8), nop(), add(10, 9, 9), jr(RA)];
        let p = run(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(10), 0x80);
    }

    /// Counts down from 3; the backward branch is taken twice
    fn loop_program() -> Vec<u32> {
        vec![
            addi(8, 0, 3),   // 0x00
            addi(8, 8, -1),  // 0x04
            nop(),           // 0x08
            nop(),           // 0x0c
            bne(8, 0, -4),   // 0x10 -> 0x04
            addi(9, 0, 7),   // 0x14
            jr(RA),          // 0x18
        ]
    }

    #[test]
    fn test_loop_results_match_across_policies() {
        for hazard in [HazardPolicy::Stall, HazardPolicy::Forward] {
            for heuristic in [
                PredictorHeuristic::Static,
                PredictorHeuristic::OneBit,
                PredictorHeuristic::TwoBit,
            ] {
                let p = run(&loop_program(), hazard, heuristic);
                let history = p.cpu.history;
                assert_eq!(p.cpu.gpr.read(8), 0);
                assert_eq!(p.cpu.gpr.read(9), 7);
                assert_eq!(history.resolved_branch_count(), 3);
                assert_eq!(p.branch_predictor.outstanding(), 0);
            }
        }
    }

    #[test]
    fn test_static_predictor_counts() {
        let p = run(&loop_program(), HazardPolicy::Forward, PredictorHeuristic::Static);
        // taken, taken, not taken
        assert_eq!(p.cpu.history.branch_miss_count, 2);
        assert_eq!(p.cpu.history.branch_hit_count, 1);
    }

    #[test]
    fn test_one_bit_predictor_counts() {
        let p = run(&loop_program(), HazardPolicy::Forward, PredictorHeuristic::OneBit);
        // not taken (miss), taken (hit), taken (miss)
        assert_eq!(p.cpu.history.branch_miss_count, 2);
        assert_eq!(p.cpu.history.branch_hit_count, 1);
    }

    #[test]
    fn test_two_bit_predictor_counts() {
        let p = run(&loop_program(), HazardPolicy::Forward, PredictorHeuristic::TwoBit);
        // history 0 -> 1 -> 2: predicts not taken twice, then taken
        assert_eq!(p.cpu.history.branch_miss_count, 3);
        assert_eq!(p.cpu.history.branch_hit_count, 0);
    }

    #[test]
    fn test_misprediction_flushes() {
        // beq at 0x08 is taken to 0x14, skipping two addi
        let program = [
            nop(),             // 0x00
            nop(),             // 0x04
            beq(0, 0, 2),      // 0x08
            addi(8, 0, 1),     // 0x0c
            addi(9, 0, 1),     // 0x10
            addi(10, 0, 1),    // 0x14
            jr(RA),            // 0x18
        ];
        let mut p = pipeline(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        let mut miss_cycle = None;
        while !p.is_finished() {
            let trace = p.step().unwrap();
            if trace.mentions("miss at 0x00000008") {
                miss_cycle = Some(trace.cycle);
                assert_eq!(p.cpu.pc.read(), 0x14);
                assert_eq!(p.current_state.if_id, IFIDRegister::default());
                assert_eq!(p.current_state.id_ex, IDEXRegister::default());
                assert_eq!(p.current_state.ex_mem, EXMEMRegister::default());
            }
        }
        // fetched in cycle 3, resolved in MEM in cycle 6
        assert_eq!(miss_cycle, Some(6));
        assert_eq!(p.cpu.history.branch_miss_count, 1);
        assert_eq!(p.cpu.gpr.read(8), 0);
        assert_eq!(p.cpu.gpr.read(9), 0);
        assert_eq!(p.cpu.gpr.read(10), 1);
    }

    #[test]
    fn test_zero_register_stays_zero() {
        let program = [addi(0, 0, 5), add(8, 0, 0), jr(RA)];
        let mut p = pipeline(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        while !p.is_finished() {
            p.step().unwrap();
            assert_eq!(p.cpu.gpr.read(0), 0);
        }
        assert_eq!(p.cpu.gpr.read(8), 0);
    }

    #[test]
    fn test_jal_links_and_returns() {
        let program = [
            add(16, 31, 0),  // 0x00: save $ra
            jal(0x10),       // 0x04
            addi(9, 0, 2),   // 0x08
            jr(16),          // 0x0c
            addi(8, 0, 1),   // 0x10
            jr(31),          // 0x14 -> 0x08
        ];
        let p = run(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(31), 0x08);
        assert_eq!(p.cpu.gpr.read(8), 1);
        assert_eq!(p.cpu.gpr.read(9), 2);
        assert_eq!(p.cpu.history.jump_count, 3);
        assert_eq!(p.cpu.history.j_type_count, 1);
    }

    #[test]
    fn test_mult_and_move_from_accumulator() {
        let program = [addi(8, 0, -3), addi(9, 0, 7), mult(8, 9), mflo(10), mfhi(11), jr(RA)];
        let p = run(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(10), -21i32 as u32);
        assert_eq!(p.cpu.gpr.read(11), 0xffff_ffff);
    }

    #[test]
    fn test_lui_ori_builds_constant() {
        let program = [lui(8, 0x1234), ori(8, 8, 0x8765), jr(RA)];
        let p = run(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(8), 0x1234_8765);
    }

    #[test]
    fn test_invalid_funct_reports_cycle() {
        let program = [r_type(9, 10, 8, 0, 0x3f), jr(RA)];
        let mut p = pipeline(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        let err = p.run(|_| {}).unwrap_err();
        match err {
            SimulatorError::CycleFailed { cycle, ref source } => {
                // fetched in 1, decoded in 2, executed in 3
                assert_eq!(cycle, 3);
                assert!(matches!(
                    **source,
                    SimulatorError::ExecutionError(ExecutionError::InvalidAluControl { .. })
                ));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_out_of_range_load_is_fatal() {
        let program = [lui(8, 0x7fff), lw(9, 0, 8), jr(RA)];
        let mut p = pipeline(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        let err = p.run(|_| {}).unwrap_err();
        assert!(matches!(err.root(), SimulatorError::MemoryError(MemoryError::AccessError { .. })));
    }

    #[test]
    fn test_execution_limit() {
        // spin forever
        let program = [j(0)];
        let mut p = pipeline(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        p.cpu.policy.max_cycles = 50;
        let err = p.run(|_| {}).unwrap_err();
        assert!(matches!(
            err.root(),
            SimulatorError::ExecutionError(ExecutionError::ExecutionLimitReached(50))
        ));
        assert_eq!(p.cpu.history.cycle_count, 50);
    }

    #[test]
    fn test_unknown_opcode_is_a_no_op() {
        let program = [0xfc00_0000, addi(8, 0, 1), jr(RA)];
        let p = run(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(8), 1);
        assert_eq!(p.cpu.history.stall_count, 0);
    }

    #[test]
    fn test_deterministic() {
        let first = run(&loop_program(), HazardPolicy::Stall, PredictorHeuristic::TwoBit);
        let second = run(&loop_program(), HazardPolicy::Stall, PredictorHeuristic::TwoBit);
        assert_eq!(first.cpu.history, second.cpu.history);
        assert_eq!(first.cpu.gpr, second.cpu.gpr);
    }

    #[test]
    fn test_trace_reports_stages() {
        let program = [addi(8, 0, 1), jr(RA)];
        let mut p = pipeline(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        let mut traces = Vec::new();
        p.run(|trace| traces.push(trace.clone())).unwrap();
        assert_eq!(traces.len(), 6);
        assert!(traces[0].mentions("[IF] 0x00000000"));
        assert!(traces[4].mentions("r[8] <- 0x1"));
        assert!(traces.iter().any(|t| t.mentions("[END]")));
    }

    /// bne at 0x14 is never taken, but a taken guess points below 0
    fn backward_guess_program() -> Vec<u32> {
        vec![
            addi(8, 0, 1),     // 0x00
            nop(),             // 0x04
            nop(),             // 0x08
            beq(0, 0, 1),      // 0x0c -> 0x14
            nop(),             // 0x10
            bne(0, 0, -100),   // 0x14
            jr(RA),            // 0x18
        ]
    }

    #[test]
    fn test_wrong_path_fetch_outside_memory_is_squashed() {
        // 1-bit: the taken beq makes the bne a taken guess into 0xfffffe88
        let mut p = pipeline(
            &backward_guess_program(),
            HazardPolicy::Forward,
            PredictorHeuristic::OneBit,
        );
        let mut faulted = false;
        while !p.is_finished() {
            let trace = p.step().unwrap();
            faulted |= trace.mentions("0xfffffe88: Memory error");
        }
        assert!(faulted);
        assert_eq!(p.cpu.gpr.read(8), 1);
        assert_eq!(p.cpu.history.branch_miss_count, 2);
        assert_eq!(p.cpu.history.branch_hit_count, 0);
        assert_eq!(p.cpu.history.cycle_count, 16);

        for heuristic in [PredictorHeuristic::Static, PredictorHeuristic::TwoBit] {
            let p = run(&backward_guess_program(), HazardPolicy::Forward, heuristic);
            assert_eq!(p.cpu.gpr.read(8), 1);
            assert_eq!(p.cpu.history.branch_miss_count, 1);
            assert_eq!(p.cpu.history.branch_hit_count, 1);
            assert_eq!(p.cpu.history.cycle_count, 13);
        }
    }

    #[test]
    fn test_fetch_outside_memory_fails_when_reached() {
        let program = [j(0x0200_0000)];
        let mut p = pipeline(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        let err = p.run(|_| {}).unwrap_err();
        match err {
            SimulatorError::CycleFailed { cycle, ref source } => {
                // redirected in 4, fetched in 5, reaches MEM in 8
                assert_eq!(cycle, 8);
                match **source {
                    SimulatorError::MemoryError(MemoryError::AccessError {
                        address,
                        ref kind,
                    }) => {
                        assert_eq!(address, 0x0200_0000);
                        assert_eq!(*kind, MemoryErrorKind::FetchOutOfBounds);
                    }
                    ref other => panic!("unexpected error: {other}"),
                }
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_branch_reads_preceding_result() {
        let program = [
            addi(8, 0, 1),     // 0x00
            bne(8, 0, 1),      // 0x04 -> 0x0c
            addi(9, 0, 5),     // 0x08
            jr(RA),            // 0x0c
        ];

        let p = run(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(9), 0);
        assert_eq!(p.cpu.history.branch_miss_count, 1);
        assert_eq!(p.cpu.history.forward_count, 1);
        assert_eq!(p.cpu.history.stall_count, 0);
        assert_eq!(p.cpu.history.cycle_count, 10);

        let p = run(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(9), 0);
        assert_eq!(p.cpu.history.branch_miss_count, 1);
        assert_eq!(p.cpu.history.stall_count, 2);
        assert_eq!(p.cpu.history.cycle_count, 12);
    }

    #[test]
    fn test_jr_reads_preceding_result() {
        let program = [
            addi(16, 0, 0x0c), // 0x00
            jr(16),            // 0x04 -> 0x0c
            addi(9, 0, 5),     // 0x08
            addi(10, 0, 7),    // 0x0c
            jr(RA),            // 0x10
        ];

        let p = run(&program, HazardPolicy::Forward, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(9), 0);
        assert_eq!(p.cpu.gpr.read(10), 7);
        assert_eq!(p.cpu.history.jump_count, 2);
        assert_eq!(p.cpu.history.stall_count, 0);
        assert_eq!(p.cpu.history.cycle_count, 11);

        let p = run(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        assert_eq!(p.cpu.gpr.read(9), 0);
        assert_eq!(p.cpu.gpr.read(10), 7);
        assert_eq!(p.cpu.history.stall_count, 2);
        assert_eq!(p.cpu.history.cycle_count, 13);
    }

    #[test]
    fn test_squashed_stall_is_not_counted() {
        // the add behind the taken beq would stall in the cycle the
        // beq redirects
        let program = [
            beq(0, 0, 3),      // 0x00 -> 0x10
            addi(8, 0, 1),     // 0x04
            add(9, 8, 8),      // 0x08
            nop(),             // 0x0c
            jr(RA),            // 0x10
        ];
        let mut p = pipeline(&program, HazardPolicy::Stall, PredictorHeuristic::Static);
        let mut stalled_on_redirect = false;
        while !p.is_finished() {
            let trace = p.step().unwrap();
            stalled_on_redirect |= trace.mentions("[STALL]") && trace.mentions("[Flush]");
        }
        assert!(stalled_on_redirect);
        assert_eq!(p.cpu.history.stall_count, 0);
        assert_eq!(p.cpu.gpr.read(8), 0);
        assert_eq!(p.cpu.gpr.read(9), 0);
        assert_eq!(p.cpu.history.cycle_count, 9);
    }
}
