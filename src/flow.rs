//! 流程控制：`if_ / elif_ / else_ / fi` 链式分支。
//!
//! 分支未命中时，构建调用被整体丢弃，使同一条链可以按运行时条件拼出不同语句。

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct FlowControl {
    in_flow: bool,
    matched: bool,
    taken: bool,
}

impl FlowControl {
    pub(crate) fn begin(&mut self, cond: bool) {
        self.in_flow = true;
        self.matched = cond;
        self.taken = cond;
    }

    pub(crate) fn elif(&mut self, cond: bool) {
        let hit = self.in_flow && !self.taken && cond;
        self.matched = hit;
        if hit {
            self.taken = true;
        }
    }

    pub(crate) fn otherwise(&mut self) {
        self.matched = self.in_flow && !self.taken;
        if self.matched {
            self.taken = true;
        }
    }

    pub(crate) fn end(&mut self) {
        *self = Self::default();
    }

    /// 当前调用是否应被丢弃。
    pub(crate) fn discards(&self) -> bool {
        self.in_flow && !self.matched
    }
}
