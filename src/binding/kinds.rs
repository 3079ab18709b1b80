//! C enum mirrors for values exchanged as plain `int`s.

/// Declares an enum with explicit native discriminants plus raw conversions
macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident = $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant = $value),+
        }

        impl $name {
            /// Decode a native value
            pub fn from_raw(raw: i32) -> Option<Self> {
                match raw {
                    $($value => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// The native value
            pub fn raw(self) -> i32 {
                self as i32
            }
        }
    };
}

native_enum! {
    /// `LLVMLinkage`
    pub enum Linkage {
        External = 0,
        AvailableExternally = 1,
        LinkOnceAny = 2,
        LinkOnceOdr = 3,
        LinkOnceOdrAutoHide = 4,
        WeakAny = 5,
        WeakOdr = 6,
        Appending = 7,
        Internal = 8,
        Private = 9,
        DllImport = 10,
        DllExport = 11,
        ExternalWeak = 12,
        Ghost = 13,
        Common = 14,
        LinkerPrivate = 15,
        LinkerPrivateWeak = 16,
    }
}

native_enum! {
    /// `LLVMVisibility`
    pub enum Visibility {
        Default = 0,
        Hidden = 1,
        Protected = 2,
    }
}

native_enum! {
    /// `LLVMDLLStorageClass`
    pub enum DllStorageClass {
        Default = 0,
        DllImport = 1,
        DllExport = 2,
    }
}

native_enum! {
    /// `LLVMValueKind`
    pub enum ValueKind {
        Argument = 0,
        BasicBlock = 1,
        MemoryUse = 2,
        MemoryDef = 3,
        MemoryPhi = 4,
        Function = 5,
        GlobalAlias = 6,
        GlobalIFunc = 7,
        GlobalVariable = 8,
        BlockAddress = 9,
        ConstantExpr = 10,
        ConstantArray = 11,
        ConstantStruct = 12,
        ConstantVector = 13,
        UndefValue = 14,
        ConstantAggregateZero = 15,
        ConstantDataArray = 16,
        ConstantDataVector = 17,
        ConstantInt = 18,
        ConstantFp = 19,
        ConstantPointerNull = 20,
        ConstantTokenNone = 21,
        MetadataAsValue = 22,
        InlineAsm = 23,
        Instruction = 24,
        Poison = 25,
        ConstantTargetNone = 26,
    }
}

native_enum! {
    /// `LLVMTypeKind`
    pub enum TypeKind {
        Void = 0,
        Half = 1,
        Float = 2,
        Double = 3,
        X86Fp80 = 4,
        Fp128 = 5,
        PpcFp128 = 6,
        Label = 7,
        Integer = 8,
        Function = 9,
        Struct = 10,
        Array = 11,
        Pointer = 12,
        Vector = 13,
        Metadata = 14,
        X86Mmx = 15,
        Token = 16,
        ScalableVector = 17,
        BFloat = 18,
        X86Amx = 19,
        TargetExt = 20,
    }
}

native_enum! {
    /// `llvm::Triple::ObjectFormatType`
    pub enum ObjectFormat {
        Unknown = 0,
        Coff = 1,
        DxContainer = 2,
        Elf = 3,
        Goff = 4,
        MachO = 5,
        SpirV = 6,
        Wasm = 7,
        Xcoff = 8,
    }
}
