//! Tiny assembler for building test programs

pub fn r_type(rs: u32, rt: u32, rd: u32, shamt: u32, funct: u32) -> u32 {
    (rs << 21) | (rt << 16) | (rd << 11) | (shamt << 6) | funct
}

pub fn i_type(opcode: u32, rs: u32, rt: u32, imm: i32) -> u32 {
    (opcode << 26) | (rs << 21) | (rt << 16) | (imm as u32 & 0xffff)
}

pub fn j_type(opcode: u32, address: u32) -> u32 {
    (opcode << 26) | ((address >> 2) & 0x03ff_ffff)
}

pub fn nop() -> u32 {
    0
}

pub fn add(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(rs, rt, rd, 0, 0x20)
}

pub fn sub(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(rs, rt, rd, 0, 0x22)
}

pub fn slt(rd: u32, rs: u32, rt: u32) -> u32 {
    r_type(rs, rt, rd, 0, 0x2a)
}

pub fn sll(rd: u32, rt: u32, shamt: u32) -> u32 {
    r_type(0, rt, rd, shamt, 0x00)
}

pub fn jr(rs: u32) -> u32 {
    r_type(rs, 0, 0, 0, 0x08)
}

pub fn mult(rs: u32, rt: u32) -> u32 {
    r_type(rs, rt, 0, 0, 0x18)
}

pub fn mfhi(rd: u32) -> u32 {
    r_type(0, 0, rd, 0, 0x10)
}

pub fn mflo(rd: u32) -> u32 {
    r_type(0, 0, rd, 0, 0x12)
}

pub fn addi(rt: u32, rs: u32, imm: i32) -> u32 {
    i_type(0x08, rs, rt, imm)
}

pub fn andi(rt: u32, rs: u32, imm: i32) -> u32 {
    i_type(0x0c, rs, rt, imm)
}

pub fn ori(rt: u32, rs: u32, imm: i32) -> u32 {
    i_type(0x0d, rs, rt, imm)
}

pub fn lui(rt: u32, imm: i32) -> u32 {
    i_type(0x0f, 0, rt, imm)
}

pub fn lw(rt: u32, offset: i32, base: u32) -> u32 {
    i_type(0x23, base, rt, offset)
}

pub fn sw(rt: u32, offset: i32, base: u32) -> u32 {
    i_type(0x2b, base, rt, offset)
}

/// `offset` counts instructions relative to the following one
pub fn beq(rs: u32, rt: u32, offset: i32) -> u32 {
    i_type(0x04, rs, rt, offset)
}

pub fn bne(rs: u32, rt: u32, offset: i32) -> u32 {
    i_type(0x05, rs, rt, offset)
}

pub fn j(address: u32) -> u32 {
    j_type(0x02, address)
}

pub fn jal(address: u32) -> u32 {
    j_type(0x03, address)
}

/// Lays the words out big-endian, as the loader expects
pub fn image(program: &[u32]) -> Vec<u8> {
    program.iter().flat_map(|word| word.to_be_bytes()).collect()
}
